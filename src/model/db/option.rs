use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{OptionId, PositionIndex, QuestionId};

/// An option row, owned by exactly one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: OptionId,
    /// The owning question.
    pub question_id: QuestionId,
    /// Display text.
    pub option_text: String,
    /// 1-based rank within the question, unique per question.
    pub position_index: PositionIndex,
    /// Whether this is a correct answer.
    pub is_correct: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
