use serde::{Deserialize, Serialize};

use crate::model::common::QuestionId;

/// Confirmation body for successful writes.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
    /// The affected question, where the client may not know it yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuestionId>,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: None,
        }
    }

    pub fn with_id(message: impl Into<String>, id: QuestionId) -> Self {
        Self {
            message: message.into(),
            id: Some(id),
        }
    }
}
