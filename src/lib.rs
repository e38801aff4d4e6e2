//! # Exam Session Engine
//!
//! 限时考试会话引擎：带着考生按顺序完成若干限时科目，
//! 收集各种题型的作答，并保证每个科目无论由倒计时到时还是
//! 手动点击触发，后端都恰好收到一次提交。
//!
//! ## 架构设计
//!
//! 本引擎采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（定时任务），只暴露能力
//! - `TickScheduler` - 滴答调度能力，测试里可手动驱动
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个科目/单道题
//! - `answer_codec` - 作答编解码能力
//! - `SectionTimer` - 科目倒计时能力
//! - `DistractionTracker` - 切屏监测能力
//! - `CaptureAdapter` - 音视频采集能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个科目"的完整提交流程
//! - `SectionCtx` - 上下文封装（考试 + 科目 + 用户标识）
//! - `SubmissionGuard` - 至多一次的提交守卫
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/session_controller` - 会话控制器，管理事件循环和资源
//! - `orchestrator/progression` - 科目推进引擎，管理当前索引和收卷
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ExamApi, ExamResults, HttpExamClient, SubmitSectionRequest};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{TickScheduler, TokioScheduler};
pub use models::{AnswerEdit, AnswerStore, Question, QuestionType, Role, Section};
pub use orchestrator::{
    RedirectTarget, SessionController, SessionEnd, SessionHandle, SessionOutcome,
};
pub use services::{
    CaptureAdapter, DistractionTracker, MediaCapture, NoopCapture, SectionTimer, TimerState,
};
pub use workflow::{SectionCtx, SubmissionGuard, SubmitOutcome};
