//! 基础设施层
//!
//! 持有稀缺资源（tokio 定时任务），只向上暴露"按固定间隔滴答"这一能力。
//! 业务层不直接接触运行时，便于在测试中用手动调度器替换。

pub mod scheduler;

pub use scheduler::{ScheduleHandle, TickFlow, TickScheduler, TokioScheduler};
