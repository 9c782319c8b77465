use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{OptionId, QuestionId},
    db::QuestionOption,
    question::{OptionParams, QuestionParams, QuestionWithOptions},
};

/// A question as submitted by the editor, for both create and edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    /// Question text.
    pub question_text: String,
    /// Options in display order.
    #[serde(default)]
    pub options: Vec<OptionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionPayload {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl From<QuestionPayload> for QuestionParams {
    fn from(payload: QuestionPayload) -> Self {
        Self {
            text: payload.question_text,
            options: payload.options.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<OptionPayload> for OptionParams {
    fn from(payload: OptionPayload) -> Self {
        Self {
            text: payload.text,
            is_correct: payload.is_correct,
        }
    }
}

/// A question with its options, as returned to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: QuestionId,
    pub question_text: String,
    /// RFC 3339, second precision, UTC.
    pub created_at: String,
    /// Ordered by position.
    pub options: Vec<OptionResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionResponse {
    pub id: OptionId,
    pub text: String,
    pub is_correct: bool,
}

impl From<QuestionWithOptions> for QuestionResponse {
    fn from(entry: QuestionWithOptions) -> Self {
        let QuestionWithOptions {
            question,
            mut options,
        } = entry;
        options.sort_by_key(|option| option.position_index);
        Self {
            id: question.id,
            question_text: question.question_text,
            created_at: question
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<QuestionOption> for OptionResponse {
    fn from(option: QuestionOption) -> Self {
        Self {
            id: option.id,
            text: option.option_text,
            is_correct: option.is_correct,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl QuestionPayload {
        pub fn example() -> Self {
            Self {
                question_text: "2+2=?".to_string(),
                options: vec![
                    OptionPayload {
                        text: "3".to_string(),
                        is_correct: false,
                    },
                    OptionPayload {
                        text: "4".to_string(),
                        is_correct: true,
                    },
                ],
            }
        }

        pub fn edited_example() -> Self {
            Self {
                question_text: "2+2=?".to_string(),
                options: vec![OptionPayload {
                    text: "5".to_string(),
                    is_correct: false,
                }],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rocket::serde::json::{serde_json, serde_json::json};

    use crate::model::db::Question;

    use super::*;

    fn option(id: OptionId, text: &str, position_index: u32, is_correct: bool) -> QuestionOption {
        QuestionOption {
            id,
            question_id: 1,
            option_text: text.to_string(),
            position_index,
            is_correct,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn payload_keeps_submission_order() {
        let params: QuestionParams = QuestionPayload::example().into();
        assert_eq!(params, QuestionParams::example());
    }

    #[test]
    fn payload_from_wire() {
        let raw = json!({
            "question_text": "<p>Pick one</p>",
            "options": [{"text": "a", "is_correct": true}, {"text": "b"}],
        });
        let payload: QuestionPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(payload.options.len(), 2);
        assert!(payload.options[0].is_correct);
        assert!(!payload.options[1].is_correct);

        // Options may be omitted entirely.
        let payload: QuestionPayload =
            serde_json::from_value(json!({"question_text": "Alone"})).unwrap();
        assert!(payload.options.is_empty());

        // The text may not.
        assert!(serde_json::from_value::<QuestionPayload>(json!({"options": []})).is_err());
    }

    #[test]
    fn response_orders_by_position_and_hides_it() {
        let entry = QuestionWithOptions {
            question: Question {
                id: 1,
                question_text: "2+2=?".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            },
            // Deliberately out of order.
            options: vec![option(11, "4", 2, true), option(10, "3", 1, false)],
        };

        let response = QuestionResponse::from(entry);
        assert_eq!(response.created_at, "2024-03-09T14:05:07Z");

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(
            wire,
            json!({
                "id": 1,
                "question_text": "2+2=?",
                "created_at": "2024-03-09T14:05:07Z",
                "options": [
                    {"id": 10, "text": "3", "is_correct": false},
                    {"id": 11, "text": "4", "is_correct": true},
                ],
            })
        );
    }
}
