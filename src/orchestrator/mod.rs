//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责会话生命周期和科目推进，是整个引擎的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `session_controller` - 会话控制器
//! - 管理会话生命周期（初始化、事件循环、收卷、销毁）
//! - 把到时与手动交卷两个触发源接到提交守卫上
//! - 管理计时器、采集器、切屏监测器资源
//! - 对接考试后端（科目、题目、交卷、成绩）
//!
//! ### `progression` - 科目推进引擎
//! - 管理当前科目索引（单调不减）
//! - 越界即收卷，收卷一次性
//!
//! ## 层次关系
//!
//! ```text
//! session_controller (会话事件循环)
//!     ↓
//! workflow::submit_section (单科目提交流程)
//!     ↓
//! services (能力层：codec / timer / distraction / capture)
//!     ↓
//! infrastructure (基础设施：TickScheduler)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：session_controller 管会话，progression 管索引
//! 2. **资源隔离**：只有编排层持有计时器和采集器
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **从不投机推进**：守卫报告成功之后才允许换科目

pub mod progression;
pub mod session_controller;

// 重新导出主要类型
pub use progression::{Progression, ProgressionEngine};
pub use session_controller::{
    RedirectTarget, SessionController, SessionEnd, SessionEvent, SessionHandle, SessionOutcome,
};
