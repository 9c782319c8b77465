//! Filters over our integer IDs.
//!
//! IDs are widened to `i64` explicitly. MongoDB compares numbers by value, so
//! the filters match whichever integer width the serializer chose on insert.

use mongodb::bson::{doc, Document};

use crate::model::common::QuestionId;

/// Filter matching the document with the given `_id`.
pub fn id_filter(id: u32) -> Document {
    doc! { "_id": i64::from(id) }
}

/// Filter matching every option belonging to the given question.
pub fn question_id_filter(question_id: QuestionId) -> Document {
    doc! { "question_id": i64::from(question_id) }
}
