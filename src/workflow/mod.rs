//! 流程层
//!
//! 定义"一个科目"的提交流程与保证其幂等性的守卫：
//! - `section_ctx` - 上下文封装（考试 + 科目 + 用户标识）
//! - `submission_guard` - 至多一次的提交守卫
//! - `section_flow` - 流程编排（载荷构建 → 守卫 → 提交）

pub mod section_ctx;
pub mod section_flow;
pub mod submission_guard;

pub use section_ctx::SectionCtx;
pub use section_flow::submit_section;
pub use submission_guard::{SubmissionGuard, SubmitOutcome};
