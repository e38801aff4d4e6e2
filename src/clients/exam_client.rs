/// 考试门户 API 客户端
///
/// 封装所有与考试后端相关的调用逻辑；
/// 信封解析和 success 标志检查都在这一层完成，调用方只看到类型化结果。
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, CaptureError};
use crate::models::{Question, Section};
use crate::services::CapturePackage;

/// 门户鉴权头
const PORTAL_TOKEN_HEADER: &str = "portaltoken";

/// 考试后端能力接口
///
/// 会话控制器只依赖本接口，测试里用内存假实现替换。
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// 拉取科目列表（顺序即作答顺序）
    async fn fetch_sections(&self, test_id: &str) -> AppResult<Vec<Section>>;

    /// 拉取某科目的题目（断线重连时附带已有作答）
    async fn fetch_questions(
        &self,
        test_id: &str,
        subject_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<Question>>;

    /// 提交一个科目的作答
    ///
    /// 非 2xx、网络失败、success=false 都按可恢复的提交错误返回。
    async fn submit_section(&self, payload: &SubmitSectionRequest) -> AppResult<()>;

    /// 上报切屏统计（服务端由此触发成绩计算）
    async fn send_distraction(&self, payload: &DistractionRequest) -> AppResult<()>;

    /// 拉取成绩
    async fn fetch_results(&self, test_id: &str, user_id: &str) -> AppResult<ExamResults>;

    /// 查询后续联动考试，没有则返回 `None`
    async fn fetch_linked_test(&self, test_id: &str) -> AppResult<Option<String>>;

    /// 上传录制数据（multipart，相对考试流程 fire-and-forget）
    async fn upload_capture(
        &self,
        test_id: &str,
        subject_id: &str,
        user_test_id: &str,
        package: CapturePackage,
    ) -> AppResult<()>;
}

/// 通用响应信封
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

/// 信封层错误
#[derive(Debug, thiserror::Error)]
enum EnvelopeError {
    #[error("接口返回 success=false: {message:?}")]
    Rejected { message: Option<String> },
    #[error("接口返回空 data")]
    EmptyData,
}

impl<T> Envelope<T> {
    /// 解开信封：success 必须为 true 且 data 非空
    fn into_data(self, endpoint: &str) -> AppResult<T> {
        if !self.success {
            let err = EnvelopeError::Rejected {
                message: self.message,
            };
            return Err(AppError::Api(ApiError::BadEnvelope {
                endpoint: endpoint.to_string(),
                message: Some(err.to_string()),
            }));
        }
        self.data.ok_or_else(|| {
            AppError::Api(ApiError::BadEnvelope {
                endpoint: endpoint.to_string(),
                message: Some(EnvelopeError::EmptyData.to_string()),
            })
        })
    }
}

/// 交卷请求体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSectionRequest {
    pub test_id: String,
    pub subject_id: String,
    pub user_test_id: String,
    pub user_id: String,
    /// 提交时刻的剩余时间（MM:SS，展示值原样回传）
    pub timer_value: String,
    pub answers: Vec<AnswerPayload>,
}

/// 单题作答载荷（题目元数据原样回传）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub question_number: String,
    pub raw_value: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub marked_for_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_marks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_file_ref: Option<String>,
}

/// 切屏统计上报
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistractionRequest {
    pub test_id: String,
    pub user_id: String,
    pub user_test_id: String,
    pub distraction_count: u32,
    pub distraction_seconds: f64,
}

/// 成绩数据
///
/// 只解出引擎关心的汇总字段，其余字段原样透传给展示层。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResults {
    #[serde(default)]
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub obtained_marks: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 联动考试
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkedTest {
    test_id: String,
}

/// 考试门户 HTTP 客户端
pub struct HttpExamClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpExamClient {
    /// 创建新的门户客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            token: config.portal_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// 通用 GET，返回解开信封后的 data
    async fn get_data<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let endpoint = self.endpoint(path);
        let response = self
            .http
            .get(&endpoint)
            .query(query)
            .header(PORTAL_TOKEN_HEADER, &self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Api(ApiError::BadStatus {
                endpoint,
                status: status.as_u16(),
            }));
        }

        let envelope: Envelope<T> = response.json().await?;
        envelope.into_data(&endpoint)
    }

    /// 通用 POST，只关心信封是否成功
    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> AppResult<()> {
        let endpoint = self.endpoint(path);
        let response = self
            .http
            .post(&endpoint)
            .header(PORTAL_TOKEN_HEADER, &self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Api(ApiError::BadStatus {
                endpoint,
                status: status.as_u16(),
            }));
        }

        let envelope: Envelope<serde_json::Value> = response.json().await?;
        if !envelope.success {
            return Err(AppError::Api(ApiError::BadEnvelope {
                endpoint,
                message: envelope.message,
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl ExamApi for HttpExamClient {
    async fn fetch_sections(&self, test_id: &str) -> AppResult<Vec<Section>> {
        self.get_data("exam/section/list", &[("testId", test_id)])
            .await
    }

    async fn fetch_questions(
        &self,
        test_id: &str,
        subject_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<Question>> {
        self.get_data(
            "exam/question/list",
            &[
                ("testId", test_id),
                ("subjectId", subject_id),
                ("userId", user_id),
            ],
        )
        .await
    }

    async fn submit_section(&self, payload: &SubmitSectionRequest) -> AppResult<()> {
        debug!("交卷 Payload: {}", serde_json::to_string(payload)?);

        // 提交失败统一归入可恢复的 Submission 类别，允许重试
        match self.post_json("exam/section/submit", payload).await {
            Ok(()) => Ok(()),
            Err(AppError::Api(ApiError::RequestFailed { source, .. })) => {
                Err(AppError::Submission(crate::error::SubmissionError::Network {
                    subject_id: payload.subject_id.clone(),
                    source,
                }))
            }
            Err(AppError::Api(ApiError::BadStatus { status, .. })) => Err(
                AppError::submission_rejected(
                    payload.subject_id.clone(),
                    Some(format!("HTTP {}", status)),
                ),
            ),
            Err(AppError::Api(ApiError::BadEnvelope { message, .. })) => Err(
                AppError::submission_rejected(payload.subject_id.clone(), message),
            ),
            Err(other) => Err(other),
        }
    }

    async fn send_distraction(&self, payload: &DistractionRequest) -> AppResult<()> {
        self.post_json("exam/distraction/save", payload).await
    }

    async fn fetch_results(&self, test_id: &str, user_id: &str) -> AppResult<ExamResults> {
        self.get_data("exam/result", &[("testId", test_id), ("userId", user_id)])
            .await
    }

    async fn fetch_linked_test(&self, test_id: &str) -> AppResult<Option<String>> {
        let endpoint = self.endpoint("exam/linked");
        let response = self
            .http
            .get(&endpoint)
            .query(&[("testId", test_id)])
            .header(PORTAL_TOKEN_HEADER, &self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Api(ApiError::BadStatus {
                endpoint,
                status: status.as_u16(),
            }));
        }

        // data 为空或 success=false 都表示没有联动考试
        let envelope: Envelope<LinkedTest> = response.json().await?;
        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope.data.map(|linked| linked.test_id))
    }

    async fn upload_capture(
        &self,
        test_id: &str,
        subject_id: &str,
        user_test_id: &str,
        package: CapturePackage,
    ) -> AppResult<()> {
        let endpoint = self.endpoint("exam/capture/upload");

        let part = reqwest::multipart::Part::bytes(package.data)
            .file_name(package.file_name)
            .mime_str("application/gzip")
            .map_err(|e| {
                AppError::Capture(CaptureError::UploadFailed {
                    source: Box::new(e),
                })
            })?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("testId", test_id.to_string())
            .text("subjectId", subject_id.to_string())
            .text("userTestId", user_test_id.to_string());

        let response = self
            .http
            .post(&endpoint)
            .header(PORTAL_TOKEN_HEADER, &self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                AppError::Capture(CaptureError::UploadFailed {
                    source: Box::new(e),
                })
            })?;

        if !response.status().is_success() {
            return Err(AppError::Capture(CaptureError::UploadFailed {
                source: format!("HTTP {}", response.status().as_u16()).into(),
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_rejects_failure_flag() {
        let envelope: Envelope<Vec<Section>> = serde_json::from_str(
            r#"{"success": false, "message": "考试不存在"}"#,
        )
        .unwrap();
        assert!(envelope.into_data("exam/section/list").is_err());
    }

    #[test]
    fn test_envelope_unwraps_data() {
        let envelope: Envelope<Vec<Section>> = serde_json::from_str(
            r#"{"success": true, "data": [{"subjectId": "MATH", "durationMinutes": 30}]}"#,
        )
        .unwrap();
        let sections = envelope.into_data("exam/section/list").unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].subject_id, "MATH");
        assert_eq!(sections[0].duration_seconds(), 1800);
    }

    #[test]
    fn test_submit_payload_serializes_camel_case() {
        let payload = SubmitSectionRequest {
            test_id: "t1".to_string(),
            subject_id: "MATH".to_string(),
            user_test_id: "ut1".to_string(),
            user_id: "u1".to_string(),
            timer_value: "04:50".to_string(),
            answers: vec![AnswerPayload {
                question_number: "1".to_string(),
                raw_value: "A,B".to_string(),
                question_type: "MULTI_CHOICE".to_string(),
                marked_for_review: false,
                negative_marks: Some(0.25),
                topic_id: None,
                resource_type: None,
                paragraph: None,
                help_file_ref: None,
            }],
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["testId"], "t1");
        assert_eq!(json["timerValue"], "04:50");
        assert_eq!(json["answers"][0]["rawValue"], "A,B");
        assert_eq!(json["answers"][0]["type"], "MULTI_CHOICE");
        assert!(json["answers"][0].get("topicId").is_none());
    }
}
