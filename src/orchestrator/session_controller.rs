//! 会话控制器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个引擎的组合根，负责一场考试会话的完整生命周期。
//!
//! ## 核心功能
//!
//! 1. **会话初始化**：校验配置、加载科目列表、进入第一个科目
//! 2. **事件循环**：到时、手动交卷、作答编辑、可见性变化、销毁，
//!    全部收敛到一个串行处理的事件队列
//! 3. **提交接线**：两个触发源都经由提交守卫，守卫说可以推进才推进
//! 4. **资源管理**：唯一持有计时器、采集器、切屏监测器的模块
//! 5. **收卷**：停止录制 → 上报切屏统计 → 拉取成绩 → 决定跳转
//!
//! ## 设计特点
//!
//! - **串行交错**：异步回调（滴答、点击、网络完成）只通过事件队列
//!   进入状态，队列逐条处理，推进从不投机
//! - **存活标志**：销毁后不再处理任何事件

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::clients::{DistractionRequest, ExamApi, ExamResults};
use crate::config::Config;
use crate::error::{AppError, BusinessError};
use crate::infrastructure::TickScheduler;
use crate::models::{AnswerEdit, AnswerStore, Question, Role, Section};
use crate::orchestrator::progression::{Progression, ProgressionEngine};
use crate::services::answer_codec;
use crate::services::{
    CaptureAdapter, CapturePackage, DistractionTracker, MediaCapture, SectionTimer, TimerState,
};
use crate::utils::logging::{log_section_start, log_session_complete, log_session_start};
use crate::workflow::{self, SectionCtx, SubmissionGuard, SubmitOutcome};

/// 会话事件
///
/// UI 事件处理器与计时器到时都以事件形式进入控制器，
/// 由事件循环逐条串行处理。
#[derive(Debug)]
pub enum SessionEvent {
    /// 科目倒计时到时
    SectionExpired { subject_id: String },
    /// 手动交卷（携带 UI 当时展示的科目）
    ManualSubmit { subject_id: String },
    /// 作答编辑
    AnswerEdit {
        question_number: String,
        edit: AnswerEdit,
    },
    /// 页面隐藏
    VisibilityHidden,
    /// 页面恢复可见
    VisibilityVisible,
    /// 导航离开，销毁会话
    Teardown,
}

/// 会话句柄：UI 侧的操作入口，可克隆
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// 手动交卷
    ///
    /// `subject_id` 是 UI 当时展示的科目；事件处理时科目已经换页的
    /// 过期点击会被丢弃，不会误交下一个科目。
    pub fn submit_section(&self, subject_id: impl Into<String>) {
        let _ = self.tx.send(SessionEvent::ManualSubmit {
            subject_id: subject_id.into(),
        });
    }

    /// 编辑某道题的作答
    pub fn edit_answer(&self, question_number: impl Into<String>, edit: AnswerEdit) {
        let _ = self.tx.send(SessionEvent::AnswerEdit {
            question_number: question_number.into(),
            edit,
        });
    }

    /// 页面隐藏通知
    pub fn visibility_hidden(&self) {
        let _ = self.tx.send(SessionEvent::VisibilityHidden);
    }

    /// 页面恢复可见通知
    pub fn visibility_visible(&self) {
        let _ = self.tx.send(SessionEvent::VisibilityVisible);
    }

    /// 销毁会话
    pub fn teardown(&self) {
        let _ = self.tx.send(SessionEvent::Teardown);
    }
}

/// 考后跳转目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// 进入联动的下一场考试
    LinkedTest(String),
    /// 考生成绩页
    ResultsPage,
    /// 管理员控制台
    AdminDashboard,
}

/// 收卷结果
#[derive(Debug)]
pub struct SessionOutcome {
    pub results: Option<ExamResults>,
    pub redirect: RedirectTarget,
}

/// 会话终点
#[derive(Debug)]
pub enum SessionEnd {
    /// 正常收卷
    Finalized(SessionOutcome),
    /// 中途销毁（导航离开）
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Expiry,
    Manual,
}

/// 会话控制器
pub struct SessionController<C: ExamApi + 'static> {
    config: Config,
    client: Arc<C>,
    scheduler: Arc<dyn TickScheduler>,
    guard: SubmissionGuard,
    progression: ProgressionEngine,
    sections: Vec<Section>,
    questions: Vec<Question>,
    answers: AnswerStore,
    timer: SectionTimer,
    distraction: DistractionTracker,
    capture: CaptureAdapter,
    events: UnboundedReceiver<SessionEvent>,
    tx: UnboundedSender<SessionEvent>,
    alive: bool,
}

impl<C: ExamApi + 'static> SessionController<C> {
    /// 初始化会话
    ///
    /// 校验配置、加载科目列表并进入第一个科目（加载题目、
    /// 启动录制与倒计时）。配置不完整属于致命错误，直接拒绝开考。
    pub async fn initialize(
        config: Config,
        client: C,
        scheduler: Arc<dyn TickScheduler>,
        device: Box<dyn MediaCapture>,
    ) -> Result<(Self, SessionHandle)> {
        config.validate().context("会话配置不完整")?;
        log_session_start(&config);

        let client = Arc::new(client);
        let sections = client
            .fetch_sections(&config.test_id)
            .await
            .context("加载科目列表失败")?;
        if sections.is_empty() {
            return Err(AppError::Business(BusinessError::EmptySectionList).into());
        }
        info!("✓ 加载到 {} 个科目", sections.len());

        let (tx, events) = mpsc::unbounded_channel();
        let capture = CaptureAdapter::new(config.capture_enabled, device);
        let progression = ProgressionEngine::new(sections.len());
        let first_duration = sections[0].duration_seconds();

        let mut controller = Self {
            config,
            client,
            scheduler,
            guard: SubmissionGuard::new(),
            progression,
            sections,
            questions: Vec::new(),
            answers: AnswerStore::new(),
            timer: SectionTimer::new(first_duration),
            distraction: DistractionTracker::new(),
            capture,
            events,
            tx,
            alive: true,
        };
        controller.enter_section(0).await?;

        let handle = SessionHandle {
            tx: controller.tx.clone(),
        };
        Ok((controller, handle))
    }

    /// 运行事件循环，直到收卷或会话销毁
    pub async fn run(mut self) -> Result<SessionEnd> {
        while let Some(event) = self.events.recv().await {
            if !self.alive {
                break;
            }
            match event {
                SessionEvent::SectionExpired { subject_id } => {
                    if subject_id != self.current_section().subject_id {
                        debug!("收到非当前科目 {} 的到时事件，忽略", subject_id);
                        continue;
                    }
                    info!("[科目 {}] ⏰ 时间到，自动交卷", subject_id);
                    if let Some(end) = self.handle_submit_trigger(Trigger::Expiry).await? {
                        return Ok(end);
                    }
                }
                SessionEvent::ManualSubmit { subject_id } => {
                    if subject_id != self.current_section().subject_id {
                        debug!("收到非当前科目 {} 的手动交卷，忽略", subject_id);
                        continue;
                    }
                    info!("[科目 {}] 📤 手动交卷", subject_id);
                    if let Some(end) = self.handle_submit_trigger(Trigger::Manual).await? {
                        return Ok(end);
                    }
                }
                SessionEvent::AnswerEdit {
                    question_number,
                    edit,
                } => self.apply_answer_edit(&question_number, edit),
                SessionEvent::VisibilityHidden => self.distraction.on_hidden(Instant::now()),
                SessionEvent::VisibilityVisible => self.distraction.on_visible(Instant::now()),
                SessionEvent::Teardown => {
                    self.teardown().await;
                    return Ok(SessionEnd::TornDown);
                }
            }
        }

        // 所有句柄都被丢弃：按导航离开处理
        self.teardown().await;
        Ok(SessionEnd::TornDown)
    }

    /// 当前科目；收卷阶段索引已越界，按最后一个科目处理
    fn current_section_index(&self) -> usize {
        self.progression.current_index().min(self.sections.len() - 1)
    }

    fn current_section(&self) -> &Section {
        &self.sections[self.current_section_index()]
    }

    fn section_ctx(&self) -> SectionCtx {
        let index = self.current_section_index();
        SectionCtx::new(
            self.config.test_id.clone(),
            self.sections[index].subject_id.clone(),
            self.config.user_test_id.clone(),
            self.config.user_id.clone(),
            index + 1,
        )
    }

    /// 进入指定科目：加载题目、重建作答集合、启动录制与倒计时
    async fn enter_section(&mut self, index: usize) -> Result<()> {
        let section = self.sections[index].clone();
        log_section_start(index + 1, self.sections.len(), &section);

        let questions = self
            .client
            .fetch_questions(
                &self.config.test_id,
                &section.subject_id,
                &self.config.user_id,
            )
            .await
            .with_context(|| format!("加载科目 {} 的题目失败", section.subject_id))?;
        info!(
            "[科目 {}] ✓ 加载到 {} 道题目",
            section.subject_id,
            questions.len()
        );

        self.answers = answer_codec::seed_store(&questions);
        self.questions = questions;

        self.capture.start_for_section(&section.subject_id).await;
        self.start_timer(&section)?;
        Ok(())
    }

    /// 为科目启动全新的倒计时实例
    fn start_timer(&mut self, section: &Section) -> Result<()> {
        let mut timer = SectionTimer::new(section.duration_seconds());
        let tx = self.tx.clone();
        let subject_id = section.subject_id.clone();
        timer.start(
            self.scheduler.as_ref(),
            // 滴答回调里只投递事件，不做任何业务
            Box::new(move || {
                let _ = tx.send(SessionEvent::SectionExpired { subject_id });
            }),
        )?;
        self.timer = timer;
        Ok(())
    }

    /// 处理一次提交触发（到时或手动）
    ///
    /// 返回 `Some(end)` 表示会话已经收卷结束。
    async fn handle_submit_trigger(&mut self, trigger: Trigger) -> Result<Option<SessionEnd>> {
        let ctx = self.section_ctx();

        // 先停录制再交卷：上传与提交是互不依赖、顺序无关的副作用
        if let Some(package) = self.capture.stop_and_package(&ctx.subject_id).await {
            self.spawn_capture_upload(&ctx, package);
        }

        let timer_value = self.timer.format_remaining();
        let outcome = workflow::submit_section(
            self.client.as_ref(),
            &self.guard,
            &ctx,
            &self.questions,
            &self.answers,
            timer_value,
        )
        .await;

        match outcome {
            SubmitOutcome::Advance => {
                // 手动交卷且倒计时尚未走完才需要取消
                if trigger == Trigger::Manual && self.timer.state() == TimerState::Running {
                    self.timer.cancel();
                }
                self.advance_or_finalize().await
            }
            SubmitOutcome::AlreadySubmitted | SubmitOutcome::Dropped => Ok(None),
            SubmitOutcome::Failed(e) => {
                // 可恢复：留在当前科目，剩余时间保持原样（到时则为 0），
                // 不阻塞输入，等待下一次触发重试
                warn!("{} ⚠️ 交卷失败，留在当前科目等待重试: {}", ctx, e);
                Ok(None)
            }
        }
    }

    /// 录制数据异步上传，不阻塞考试流程
    fn spawn_capture_upload(&self, ctx: &SectionCtx, package: CapturePackage) {
        let client = Arc::clone(&self.client);
        let test_id = ctx.test_id.clone();
        let subject_id = ctx.subject_id.clone();
        let user_test_id = ctx.user_test_id.clone();
        tokio::spawn(async move {
            match client
                .upload_capture(&test_id, &subject_id, &user_test_id, package)
                .await
            {
                Ok(()) => info!("[科目 {}] 🎥 录制上传完成", subject_id),
                Err(e) => warn!("[科目 {}] ⚠️ 录制上传失败（不阻塞考试）: {}", subject_id, e),
            }
        });
    }

    async fn advance_or_finalize(&mut self) -> Result<Option<SessionEnd>> {
        match self.progression.advance() {
            Progression::NextSection(index) => {
                self.enter_section(index).await?;
                Ok(None)
            }
            Progression::Finished => {
                let outcome = self.finalize().await;
                Ok(Some(SessionEnd::Finalized(outcome)))
            }
        }
    }

    /// 收卷：停止录制 → 上报切屏统计 → 拉取成绩 → 决定跳转
    async fn finalize(&mut self) -> SessionOutcome {
        if !self.progression.begin_finalize() {
            // 幂等兜底：重复收卷不再产生任何副作用
            return SessionOutcome {
                results: None,
                redirect: self.default_redirect(),
            };
        }
        info!("🏁 全部科目完成，开始收卷...");

        // 最后一科提交前已停止录制，这里兜底处理仍在录制的情况
        let ctx = self.section_ctx();
        if let Some(package) = self.capture.stop_and_package(&ctx.subject_id).await {
            self.spawn_capture_upload(&ctx, package);
        }

        let log = self.distraction.finish(Instant::now());
        let report = DistractionRequest {
            test_id: self.config.test_id.clone(),
            user_id: self.config.user_id.clone(),
            user_test_id: self.config.user_test_id.clone(),
            distraction_count: log.count,
            distraction_seconds: log.total_away_seconds,
        };
        let distraction_ok = match self.client.send_distraction(&report).await {
            Ok(()) => {
                info!(
                    "✓ 切屏统计已上报: {} 次 / {:.1} 秒",
                    log.count, log.total_away_seconds
                );
                true
            }
            Err(e) => {
                warn!("⚠️ 切屏统计上报失败: {}", e);
                false
            }
        };

        // 统计上报失败时管理员走兜底路径，不再请求成绩
        let results = if !distraction_ok && self.config.role == Role::Admin {
            None
        } else {
            self.fetch_results_with_retry().await
        };

        let redirect = self.resolve_redirect().await;
        log_session_complete(&self.config, results.is_some(), &log);
        SessionOutcome { results, redirect }
    }

    /// 拉取成绩，失败后恰好重试一次
    async fn fetch_results_with_retry(&self) -> Option<ExamResults> {
        match self
            .client
            .fetch_results(&self.config.test_id, &self.config.user_id)
            .await
        {
            Ok(results) => Some(results),
            Err(first) => {
                warn!("⚠️ 拉取成绩失败，重试一次: {}", first);
                match self
                    .client
                    .fetch_results(&self.config.test_id, &self.config.user_id)
                    .await
                {
                    Ok(results) => Some(results),
                    Err(second) => {
                        error!("❌ 成绩拉取再次失败: {}", second);
                        None
                    }
                }
            }
        }
    }

    /// 决定考后跳转：优先联动考试，查询失败回落到角色默认页
    async fn resolve_redirect(&self) -> RedirectTarget {
        match self.client.fetch_linked_test(&self.config.test_id).await {
            Ok(Some(linked)) => {
                info!("→ 存在联动考试 {}，跳转继续作答", linked);
                RedirectTarget::LinkedTest(linked)
            }
            Ok(None) => self.default_redirect(),
            Err(e) => {
                warn!("⚠️ 联动考试查询失败，使用默认跳转: {}", e);
                self.default_redirect()
            }
        }
    }

    fn default_redirect(&self) -> RedirectTarget {
        match self.config.role {
            Role::Student => RedirectTarget::ResultsPage,
            Role::Admin => RedirectTarget::AdminDashboard,
        }
    }

    /// 应用一次作答编辑
    fn apply_answer_edit(&mut self, question_number: &str, edit: AnswerEdit) {
        let Some(question) = self
            .questions
            .iter()
            .find(|q| q.question_number == question_number)
        else {
            warn!("收到未知题号 {} 的编辑动作，忽略", question_number);
            return;
        };

        if let AnswerEdit::MarkForReview(marked) = edit {
            self.answers.set_marked_for_review(question_number, marked);
            return;
        }

        let current = self
            .answers
            .get(question_number)
            .map(|s| s.raw_value.clone())
            .unwrap_or_default();
        let next = answer_codec::apply_edit(question, &current, &edit);
        self.answers.set_raw_value(question_number, next);
    }

    /// 销毁会话：取消倒计时、丢弃录制缓冲，之后不再处理任何事件
    async fn teardown(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        info!("🚪 会话销毁：取消计时器、停止录制");

        if self.timer.state() == TimerState::Running {
            self.timer.cancel();
        }
        if self.capture.is_recording() {
            // 导航离开只停止采集，录制数据不再上传
            let subject_id = self.current_section().subject_id.clone();
            let _ = self.capture.stop_and_package(&subject_id).await;
        }
    }
}
