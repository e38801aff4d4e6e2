pub mod answer;
pub mod question;
pub mod role;
pub mod section;

pub use answer::{AnswerEdit, AnswerState, AnswerStore};
pub use question::{Question, QuestionType, CHOICE_ALPHABET};
pub use role::Role;
pub use section::Section;
