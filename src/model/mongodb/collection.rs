use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{Question, QuestionOption};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for Question {
    const NAME: &'static str = "questions";
}

impl MongoCollection for QuestionOption {
    const NAME: &'static str = "options";
}

impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    // Positions are unique within a question.
    let unique = IndexOptions::builder().unique(true).build();
    let position_index = IndexModel::builder()
        .keys(doc! {"question_id": 1, "position_index": 1})
        .options(unique)
        .build();
    Coll::<QuestionOption>::from_db(db)
        .create_index(position_index, None)
        .await?;

    // Listing order.
    let listing_index = IndexModel::builder()
        .keys(doc! {"created_at": 1, "_id": 1})
        .build();
    Coll::<Question>::from_db(db)
        .create_index(listing_index, None)
        .await?;

    Ok(())
}
