//! 提交守卫
//!
//! "提交当前科目"有两个独立触发源：倒计时到时和手动点击。
//! 守卫保证任意交错下，后端对每个科目最多收到一次被采纳的提交：
//!
//! 1. 科目已提交 → 立即返回 `AlreadySubmitted`，不发网络请求
//! 2. 任何科目的提交在途 → 直接丢弃本次触发（不排队）
//! 3. 否则在同一个临界区内标记"在途"，然后才开始异步请求
//! 4. 成功 → 标记已提交、清除在途、允许推进
//! 5. 失败 → 只清除在途，科目保持未提交，等待下一次触发重试
//!
//! "已提交"集合和"在途"标志是计时路径与点击路径之间唯一共享的
//! 可变状态，收敛在一把锁里；锁只覆盖同步的检查-置位，从不跨越 await。

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;

use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};

/// 单次提交的结果
#[derive(Debug)]
pub enum SubmitOutcome {
    /// 提交被采纳，可以推进到下一科目
    Advance,
    /// 该科目早已提交，本次触发无事发生
    AlreadySubmitted,
    /// 已有提交在途，本次触发被丢弃
    Dropped,
    /// 提交失败（可恢复），科目保持未提交
    Failed(AppError),
}

#[derive(Debug)]
enum BeginSubmit {
    Proceed,
    AlreadySubmitted,
    Dropped,
}

#[derive(Debug, Default)]
struct GuardState {
    submitted: HashSet<String>,
    in_flight: bool,
}

/// 提交守卫
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    state: Mutex<GuardState>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 检查并置位，单个临界区内完成
    fn begin(&self, subject_id: &str) -> BeginSubmit {
        let mut state = self.state.lock().expect("guard lock poisoned");
        if state.submitted.contains(subject_id) {
            return BeginSubmit::AlreadySubmitted;
        }
        if state.in_flight {
            return BeginSubmit::Dropped;
        }
        state.in_flight = true;
        BeginSubmit::Proceed
    }

    fn complete_success(&self, subject_id: &str) {
        let mut state = self.state.lock().expect("guard lock poisoned");
        state.submitted.insert(subject_id.to_string());
        state.in_flight = false;
    }

    fn complete_failure(&self) {
        let mut state = self.state.lock().expect("guard lock poisoned");
        state.in_flight = false;
    }

    /// 某科目是否已提交
    pub fn is_submitted(&self, subject_id: &str) -> bool {
        self.state
            .lock()
            .expect("guard lock poisoned")
            .submitted
            .contains(subject_id)
    }

    /// 提交一个科目，`send` 是实际的网络调用
    ///
    /// "在途"标记在进入异步之前同步置位，
    /// 这正是关闭到时路径与点击路径竞争的关键。
    pub async fn submit<F, Fut>(&self, subject_id: &str, send: F) -> SubmitOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<()>>,
    {
        match self.begin(subject_id) {
            BeginSubmit::AlreadySubmitted => {
                debug!("[科目 {}] 已提交过，忽略本次触发", subject_id);
                SubmitOutcome::AlreadySubmitted
            }
            BeginSubmit::Dropped => {
                debug!("[科目 {}] 已有提交在途，丢弃本次触发", subject_id);
                SubmitOutcome::Dropped
            }
            BeginSubmit::Proceed => match send().await {
                Ok(()) => {
                    self.complete_success(subject_id);
                    info!("[科目 {}] ✓ 提交成功", subject_id);
                    SubmitOutcome::Advance
                }
                Err(e) => {
                    self.complete_failure();
                    error!("[科目 {}] ❌ 提交失败，保持未提交等待重试: {}", subject_id, e);
                    SubmitOutcome::Failed(e)
                }
            },
        }
    }

    /// 无作答科目的提交：跳过网络请求，直接走"标记已提交/推进"
    pub fn submit_empty(&self, subject_id: &str) -> SubmitOutcome {
        match self.begin(subject_id) {
            BeginSubmit::AlreadySubmitted => SubmitOutcome::AlreadySubmitted,
            BeginSubmit::Dropped => SubmitOutcome::Dropped,
            BeginSubmit::Proceed => {
                self.complete_success(subject_id);
                info!("[科目 {}] 没有任何作答，跳过网络提交直接推进", subject_id);
                SubmitOutcome::Advance
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_successful_submit_marks_subject() {
        let guard = SubmissionGuard::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = Arc::clone(&calls);
        let outcome = guard
            .submit("MATH", move || async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(outcome, SubmitOutcome::Advance));
        assert!(guard.is_submitted("MATH"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_trigger_sees_already_submitted() {
        let guard = SubmissionGuard::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&calls);
        guard
            .submit("MATH", move || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        let c2 = Arc::clone(&calls);
        let outcome = guard
            .submit("MATH", move || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(outcome, SubmitOutcome::AlreadySubmitted));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "后端只应收到一次请求");
    }

    #[tokio::test]
    async fn test_concurrent_trigger_is_dropped_not_queued() {
        let guard = Arc::new(SubmissionGuard::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());

        // 第一个触发：网络请求卡在 gate 上，保持"在途"
        let guard1 = Arc::clone(&guard);
        let calls1 = Arc::clone(&calls);
        let gate1 = Arc::clone(&gate);
        let first = tokio::spawn(async move {
            guard1
                .submit("MATH", move || async move {
                    calls1.fetch_add(1, Ordering::SeqCst);
                    gate1.notified().await;
                    Ok(())
                })
                .await
        });

        // 等第一个触发进入在途状态
        tokio::task::yield_now().await;

        // 第二个触发（同一科目，模拟到时与点击同刻发生）：被丢弃
        let calls2 = Arc::clone(&calls);
        let outcome = guard
            .submit("MATH", move || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(outcome, SubmitOutcome::Dropped));

        // 在途期间其他科目的触发同样被丢弃（全局唯一在途标志）
        let outcome = guard.submit_empty("ENGLISH");
        assert!(matches!(outcome, SubmitOutcome::Dropped));

        gate.notify_one();
        let first_outcome = first.await.unwrap();
        assert!(matches!(first_outcome, SubmitOutcome::Advance));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "只有第一个触发碰到网络");
    }

    #[tokio::test]
    async fn test_failure_clears_in_flight_and_allows_retry() {
        let guard = SubmissionGuard::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&calls);
        let outcome = guard
            .submit("MATH", move || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                Err(AppError::submission_rejected("MATH", Some("服务器繁忙".to_string())))
            })
            .await;
        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert!(!guard.is_submitted("MATH"));

        // 同一触发源可以重试，这次成功
        let c2 = Arc::clone(&calls);
        let outcome = guard
            .submit("MATH", move || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(outcome, SubmitOutcome::Advance));
        assert!(guard.is_submitted("MATH"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_submit_empty_skips_network_but_marks_submitted() {
        let guard = SubmissionGuard::new();
        let outcome = guard.submit_empty("MATH");
        assert!(matches!(outcome, SubmitOutcome::Advance));
        assert!(guard.is_submitted("MATH"));

        // 之后的触发看到已提交
        let outcome = guard.submit_empty("MATH");
        assert!(matches!(outcome, SubmitOutcome::AlreadySubmitted));
    }
}
