//! 科目提交流程 - 流程层
//!
//! 核心职责：定义"一个科目"的完整提交流程
//!
//! 流程顺序：
//! 1. 统计已作答题数（零作答直接跳过网络）
//! 2. 构建提交载荷（题目元数据原样回传）
//! 3. 经由提交守卫发起网络请求
//!
//! 本层不持有计时器和采集器：调用方保证在进入本流程之前
//! 已经停止录制，使上传与交卷成为互不依赖的副作用。

use tracing::info;

use crate::clients::{AnswerPayload, ExamApi, SubmitSectionRequest};
use crate::models::{AnswerStore, Question};
use crate::workflow::section_ctx::SectionCtx;
use crate::workflow::submission_guard::{SubmissionGuard, SubmitOutcome};

/// 提交一个科目的作答
pub async fn submit_section<C: ExamApi + ?Sized>(
    client: &C,
    guard: &SubmissionGuard,
    ctx: &SectionCtx,
    questions: &[Question],
    answers: &AnswerStore,
    timer_value: String,
) -> SubmitOutcome {
    let attempted = answers.attempted_count();

    if attempted == 0 {
        return guard.submit_empty(&ctx.subject_id);
    }

    info!(
        "{} 📤 正在提交科目作答 ({}/{} 题已作答, 剩余 {})...",
        ctx,
        attempted,
        questions.len(),
        timer_value
    );

    let payload = build_submit_payload(ctx, questions, answers, timer_value);
    guard
        .submit(&ctx.subject_id, || client.submit_section(&payload))
        .await
}

/// 构建交卷载荷
///
/// 所有题目（含未作答）都进入载荷，题目元数据原样回传。
fn build_submit_payload(
    ctx: &SectionCtx,
    questions: &[Question],
    answers: &AnswerStore,
    timer_value: String,
) -> SubmitSectionRequest {
    let answer_payloads = questions
        .iter()
        .map(|question| {
            let state = answers.get(&question.question_number);
            AnswerPayload {
                question_number: question.question_number.clone(),
                raw_value: state.map(|s| s.raw_value.clone()).unwrap_or_default(),
                question_type: question.qtype.wire_name().to_string(),
                marked_for_review: state.map(|s| s.marked_for_review).unwrap_or(false),
                negative_marks: question.negative_marks,
                topic_id: question.topic_id.clone(),
                resource_type: question.resource_type.clone(),
                paragraph: question.paragraph.clone(),
                help_file_ref: question.help_file_ref.clone(),
            }
        })
        .collect();

    SubmitSectionRequest {
        test_id: ctx.test_id.clone(),
        subject_id: ctx.subject_id.clone(),
        user_test_id: ctx.user_test_id.clone(),
        user_id: ctx.user_id.clone(),
        timer_value,
        answers: answer_payloads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerState, QuestionType};

    fn question(number: &str, qtype: QuestionType) -> Question {
        Question {
            question_number: number.to_string(),
            qtype,
            choice1: Some("一".to_string()),
            choice2: Some("二".to_string()),
            choice3: None,
            choice4: None,
            negative_marks: Some(0.5),
            topic_id: Some("topic-9".to_string()),
            resource_type: None,
            paragraph: None,
            help_file_ref: None,
            answer: None,
        }
    }

    fn ctx() -> SectionCtx {
        SectionCtx::new(
            "t1".to_string(),
            "MATH".to_string(),
            "ut1".to_string(),
            "u1".to_string(),
            1,
        )
    }

    #[test]
    fn test_payload_echoes_question_metadata() {
        let questions = vec![
            question("1", QuestionType::SingleChoice),
            question("2", QuestionType::MultiChoice),
        ];
        let mut answers = AnswerStore::new();
        answers.insert("1", AnswerState::with_value("B"));
        answers.insert("2", AnswerState::default());

        let payload = build_submit_payload(&ctx(), &questions, &answers, "04:50".to_string());

        assert_eq!(payload.subject_id, "MATH");
        assert_eq!(payload.timer_value, "04:50");
        assert_eq!(payload.answers.len(), 2, "未作答题目也要进入载荷");
        assert_eq!(payload.answers[0].raw_value, "B");
        assert_eq!(payload.answers[0].negative_marks, Some(0.5));
        assert_eq!(payload.answers[0].topic_id.as_deref(), Some("topic-9"));
        assert_eq!(payload.answers[1].raw_value, "");
    }
}
