//! 滴答调度器
//!
//! 计时器逻辑不直接依赖任何运行时：它只认识
//! `schedule(interval, tick) → 可取消句柄` 这一个抽象。
//! 生产环境用 `TokioScheduler`，测试里可以手动驱动滴答。

use std::time::Duration;

use tokio::task::JoinHandle;

/// 单次滴答的返回值：继续调度还是停止
///
/// 计时器到时后通过返回 `Stop` 取消自己的重复调度，
/// 保证到时效果只触发一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// 可取消的调度句柄
pub trait ScheduleHandle: Send + Sync {
    /// 取消后续所有滴答；对已停止的调度重复调用无害
    fn cancel(&mut self);
}

/// 滴答调度能力
pub trait TickScheduler: Send + Sync {
    /// 以固定间隔重复调用 `tick`，直到 `tick` 返回 [`TickFlow::Stop`]
    /// 或句柄被取消
    fn schedule(
        &self,
        interval: Duration,
        tick: Box<dyn FnMut() -> TickFlow + Send>,
    ) -> Box<dyn ScheduleHandle>;
}

/// 基于 tokio 的调度器实现
#[derive(Debug, Default, Clone)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl TickScheduler for TokioScheduler {
    fn schedule(
        &self,
        interval: Duration,
        mut tick: Box<dyn FnMut() -> TickFlow + Send>,
    ) -> Box<dyn ScheduleHandle> {
        let task = tokio::spawn(async move {
            // 第一次滴答在一个完整间隔之后，而不是立即触发
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                if tick() == TickFlow::Stop {
                    break;
                }
            }
        });
        Box::new(TokioScheduleHandle { task })
    }
}

struct TokioScheduleHandle {
    task: JoinHandle<()>,
}

impl ScheduleHandle for TokioScheduleHandle {
    fn cancel(&mut self) {
        self.task.abort();
    }
}

impl Drop for TokioScheduleHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_ticks_at_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let scheduler = TokioScheduler::new();
        let _handle = scheduler.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
                TickFlow::Continue
            }),
        );

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(3500)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_the_schedule() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let scheduler = TokioScheduler::new();
        let _handle = scheduler.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                let n = count_clone.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= 2 {
                    TickFlow::Stop
                } else {
                    TickFlow::Continue
                }
            }),
        );

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_future_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let scheduler = TokioScheduler::new();
        let mut handle = scheduler.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
                TickFlow::Continue
            }),
        );

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        handle.cancel();
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
