//! The question bank use cases: transactional writes and assembled reads.

mod reader;
mod writer;

pub use reader::QuestionReader;
pub use writer::QuestionWriter;

use crate::model::db::{Question, QuestionOption};

/// Write parameters for creating or replacing a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionParams {
    pub text: String,
    /// Options in submission order; the order is their position.
    pub options: Vec<OptionParams>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionParams {
    pub text: String,
    pub is_correct: bool,
}

/// A question together with its options, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionWithOptions {
    pub question: Question,
    pub options: Vec<QuestionOption>,
}
