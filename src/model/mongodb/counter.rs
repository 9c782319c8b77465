use log::debug;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// Counter backing question IDs.
pub const QUESTION_ID_COUNTER: &str = "question_id";
/// Counter backing option IDs.
pub const OPTION_ID_COUNTER: &str = "option_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the counter with the given ID.
    ///
    /// Runs outside any transaction, so a rolled-back write leaves a gap in the IDs.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| Error::Internal(format!("Missing counter {id}")))?;
        Ok(counter.next)
    }
}

/// Ensure the question and option ID counters exist, starting at 1.
///
/// This operation is idempotent.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> Result<()> {
    debug!("Ensuring ID counters exist");
    let upsert = UpdateOptions::builder().upsert(true).build();
    for id in [QUESTION_ID_COUNTER, OPTION_ID_COUNTER] {
        let update = doc! {
            "$setOnInsert": { "next": 1_i64 }
        };
        counters
            .update_one(doc! { "_id": id }, update, upsert.clone())
            .await?;
    }
    Ok(())
}
