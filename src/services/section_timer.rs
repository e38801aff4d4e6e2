//! 科目倒计时 - 业务能力层
//!
//! 状态机：`Idle → Running → Expired`（终态）或 `Running → Cancelled`（终态，
//! 手动交卷或会话销毁时）。终态实例不可复用，下一科目必须新建实例。
//!
//! 滴答计数是已用时间的唯一来源：UI 展示值永远由
//! `remaining = max(0, duration - elapsed)` 推导，不允许采样墙钟，
//! 唯一的漂移矫正是把剩余时间截断到 0。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{AppError, AppResult, BusinessError};
use crate::infrastructure::{ScheduleHandle, TickFlow, TickScheduler};

/// 计时器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    /// 到时（终态）
    Expired,
    /// 手动取消（终态）
    Cancelled,
}

impl TimerState {
    pub fn name(self) -> &'static str {
        match self {
            TimerState::Idle => "Idle",
            TimerState::Running => "Running",
            TimerState::Expired => "Expired",
            TimerState::Cancelled => "Cancelled",
        }
    }
}

struct TimerInner {
    state: TimerState,
    duration_secs: u64,
    elapsed_secs: u64,
    on_expire: Option<Box<dyn FnOnce() + Send>>,
}

/// 科目倒计时
pub struct SectionTimer {
    inner: Arc<Mutex<TimerInner>>,
    handle: Option<Box<dyn ScheduleHandle>>,
}

impl SectionTimer {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimerInner {
                state: TimerState::Idle,
                duration_secs,
                elapsed_secs: 0,
                on_expire: None,
            })),
            handle: None,
        }
    }

    /// 启动倒计时（仅允许 Idle 状态），按 1 秒间隔滴答
    ///
    /// 到时后计时器先取消自己的重复调度再触发 `on_expire`，
    /// 即使还有滴答在途，到时效果也只发生一次。
    pub fn start(
        &mut self,
        scheduler: &dyn TickScheduler,
        on_expire: Box<dyn FnOnce() + Send>,
    ) -> AppResult<()> {
        {
            let mut inner = self.inner.lock().expect("timer lock poisoned");
            if inner.state != TimerState::Idle {
                return Err(AppError::Business(BusinessError::InvalidTimerState {
                    expected: TimerState::Idle.name(),
                    actual: inner.state.name(),
                }));
            }
            inner.state = TimerState::Running;
            inner.on_expire = Some(on_expire);
        }

        let inner = Arc::clone(&self.inner);
        let handle = scheduler.schedule(
            Duration::from_secs(1),
            Box::new(move || Self::tick(&inner)),
        );
        self.handle = Some(handle);
        Ok(())
    }

    fn tick(inner: &Arc<Mutex<TimerInner>>) -> TickFlow {
        // 回调在锁外执行，锁内只做状态迁移
        let expired_callback = {
            let mut guard = inner.lock().expect("timer lock poisoned");
            if guard.state != TimerState::Running {
                return TickFlow::Stop;
            }
            guard.elapsed_secs += 1;
            if guard.elapsed_secs >= guard.duration_secs {
                guard.state = TimerState::Expired;
                guard.on_expire.take()
            } else {
                None
            }
        };

        match expired_callback {
            Some(callback) => {
                callback();
                TickFlow::Stop
            }
            None => TickFlow::Continue,
        }
    }

    /// 取消倒计时（仅在 Running 状态下生效），返回是否发生了状态迁移
    pub fn cancel(&mut self) -> bool {
        let mut inner = self.inner.lock().expect("timer lock poisoned");
        if inner.state != TimerState::Running {
            warn!("对 {} 状态的计时器调用 cancel，忽略", inner.state.name());
            return false;
        }
        inner.state = TimerState::Cancelled;
        inner.on_expire = None;
        drop(inner);

        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }
        debug!("计时器已取消");
        true
    }

    pub fn state(&self) -> TimerState {
        self.inner.lock().expect("timer lock poisoned").state
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.inner.lock().expect("timer lock poisoned").elapsed_secs
    }

    /// 剩余秒数，永不为负
    pub fn remaining_secs(&self) -> u64 {
        let inner = self.inner.lock().expect("timer lock poisoned");
        inner.duration_secs.saturating_sub(inner.elapsed_secs)
    }

    /// 展示用剩余时间（MM:SS），推导值，从不落库
    pub fn format_remaining(&self) -> String {
        format_mm_ss(self.remaining_secs())
    }
}

impl Drop for SectionTimer {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

/// 秒数格式化为 MM:SS
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 手动驱动的调度器：测试里逐次触发滴答
    #[derive(Default, Clone)]
    struct ManualScheduler {
        slot: Arc<Mutex<Option<Box<dyn FnMut() -> TickFlow + Send>>>>,
    }

    impl ManualScheduler {
        /// 触发一次滴答；到时后的"在途滴答"也通过再次调用本方法模拟
        fn fire(&self) {
            let mut slot = self.slot.lock().unwrap();
            if let Some(tick) = slot.as_mut() {
                tick();
            }
        }

        fn is_scheduled(&self) -> bool {
            self.slot.lock().unwrap().is_some()
        }
    }

    impl TickScheduler for ManualScheduler {
        fn schedule(
            &self,
            _interval: Duration,
            tick: Box<dyn FnMut() -> TickFlow + Send>,
        ) -> Box<dyn ScheduleHandle> {
            *self.slot.lock().unwrap() = Some(tick);
            Box::new(ManualHandle {
                slot: Arc::clone(&self.slot),
            })
        }
    }

    struct ManualHandle {
        slot: Arc<Mutex<Option<Box<dyn FnMut() -> TickFlow + Send>>>>,
    }

    impl ScheduleHandle for ManualHandle {
        fn cancel(&mut self) {
            self.slot.lock().unwrap().take();
        }
    }

    fn started_timer(
        duration_secs: u64,
        scheduler: &ManualScheduler,
    ) -> (SectionTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let mut timer = SectionTimer::new(duration_secs);
        timer
            .start(
                scheduler,
                Box::new(move || {
                    fired_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        (timer, fired)
    }

    #[test]
    fn test_expiry_fires_exactly_once() {
        let scheduler = ManualScheduler::default();
        let (timer, fired) = started_timer(3, &scheduler);

        for _ in 0..3 {
            scheduler.fire();
        }
        assert_eq!(timer.state(), TimerState::Expired);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // 模拟在途滴答继续触发：不再有任何效果
        scheduler.fire();
        scheduler.fire();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.elapsed_secs(), 3);
    }

    #[test]
    fn test_remaining_is_monotonic_and_clamps_at_zero() {
        let scheduler = ManualScheduler::default();
        let (timer, _fired) = started_timer(2, &scheduler);

        let mut previous = timer.remaining_secs();
        for _ in 0..5 {
            scheduler.fire();
            let now = timer.remaining_secs();
            assert!(now <= previous);
            previous = now;
        }
        assert_eq!(timer.remaining_secs(), 0);
    }

    #[test]
    fn test_cancel_only_while_running() {
        let scheduler = ManualScheduler::default();
        let (mut timer, fired) = started_timer(10, &scheduler);

        scheduler.fire();
        assert!(timer.cancel());
        assert_eq!(timer.state(), TimerState::Cancelled);
        assert!(!scheduler.is_scheduled());

        // 终态后再取消无效
        assert!(!timer.cancel());
        // 取消后滴答不再产生任何效果
        scheduler.fire();
        assert_eq!(timer.elapsed_secs(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_terminal_timer_cannot_restart() {
        let scheduler = ManualScheduler::default();
        let (mut timer, _fired) = started_timer(1, &scheduler);
        scheduler.fire();
        assert_eq!(timer.state(), TimerState::Expired);

        let result = timer.start(&scheduler, Box::new(|| {}));
        assert!(result.is_err());
    }

    #[test]
    fn test_format_mm_ss() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(61), "01:01");
        assert_eq!(format_mm_ss(600), "10:00");
        assert_eq!(format_mm_ss(59), "00:59");
    }
}
