pub mod exam_client;

pub use exam_client::{
    AnswerPayload, DistractionRequest, ExamApi, ExamResults, HttpExamClient,
    SubmitSectionRequest,
};
