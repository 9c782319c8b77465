use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::QuestionId;

/// A question row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: QuestionId,
    /// Prompt text, as produced by the editor.
    pub question_text: String,
    /// Set once on creation; edits never touch it.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
