//! 切屏监测 - 业务能力层
//!
//! 订阅页面可见性变化：隐藏时记一次切屏并记录起始时刻，
//! 恢复可见时把离开时长累加进总数。纯累加，没有任何提交副作用；
//! 累计结果在会话收卷时一次性上报。

use tokio::time::Instant;
use tracing::debug;

/// 切屏累计数据
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistractionLog {
    /// 切屏次数
    pub count: u32,
    /// 累计离开秒数
    pub total_away_seconds: f64,
}

/// 切屏监测器
#[derive(Debug)]
pub struct DistractionTracker {
    count: u32,
    total_away_seconds: f64,
    away_started_at: Option<Instant>,
}

impl DistractionTracker {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_away_seconds: 0.0,
            away_started_at: None,
        }
    }

    /// 页面隐藏：计数 +1 并记录起始时刻
    ///
    /// 已处于隐藏状态时的重复通知被忽略。
    pub fn on_hidden(&mut self, now: Instant) {
        if self.away_started_at.is_some() {
            return;
        }
        self.count += 1;
        self.away_started_at = Some(now);
        debug!("页面隐藏，切屏计数: {}", self.count);
    }

    /// 页面恢复可见：累加离开时长
    pub fn on_visible(&mut self, now: Instant) {
        if let Some(started_at) = self.away_started_at.take() {
            let away = now.saturating_duration_since(started_at).as_secs_f64();
            self.total_away_seconds += away;
            debug!("页面恢复，本次离开 {:.1} 秒", away);
        }
    }

    /// 收卷时结算：若仍处于隐藏状态，把未闭合的区间也计入
    pub fn finish(&mut self, now: Instant) -> DistractionLog {
        self.on_visible(now);
        DistractionLog {
            count: self.count,
            total_away_seconds: self.total_away_seconds,
        }
    }

    pub fn snapshot(&self) -> DistractionLog {
        DistractionLog {
            count: self.count,
            total_away_seconds: self.total_away_seconds,
        }
    }
}

impl Default for DistractionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_accumulates_away_time_across_spans() {
        let mut tracker = DistractionTracker::new();

        tracker.on_hidden(Instant::now());
        tokio::time::advance(Duration::from_secs(3)).await;
        tracker.on_visible(Instant::now());

        tracker.on_hidden(Instant::now());
        tokio::time::advance(Duration::from_secs(2)).await;
        tracker.on_visible(Instant::now());

        let log = tracker.snapshot();
        assert_eq!(log.count, 2);
        assert!((log.total_away_seconds - 5.0).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_hidden_notifications_are_ignored() {
        let mut tracker = DistractionTracker::new();

        tracker.on_hidden(Instant::now());
        tracker.on_hidden(Instant::now());
        assert_eq!(tracker.snapshot().count, 1);

        // 没有隐藏区间时的 visible 通知同样无效
        tracker.on_visible(Instant::now());
        tracker.on_visible(Instant::now());
        assert_eq!(tracker.snapshot().count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_closes_open_span() {
        let mut tracker = DistractionTracker::new();

        tracker.on_hidden(Instant::now());
        tokio::time::advance(Duration::from_secs(4)).await;

        let log = tracker.finish(Instant::now());
        assert_eq!(log.count, 1);
        assert!((log.total_away_seconds - 4.0).abs() < 0.01);
    }
}
