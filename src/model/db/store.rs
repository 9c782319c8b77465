use chrono::{DateTime, Utc};
use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::{OptionId, PositionIndex, QuestionId},
    mongodb::{
        id_filter, question_id_filter, Coll, Counter, Txn, OPTION_ID_COUNTER,
        QUESTION_ID_COUNTER,
    },
};

use super::{Question, QuestionOption};

/// Typed row-level operations over the question and option collections.
///
/// Writes take a [`Txn`] so several of them can share one atomic unit.
/// Reads run on the default connection: each is a single statement and
/// therefore consistent on its own.
#[derive(Clone)]
pub struct QuestionStore {
    questions: Coll<Question>,
    options: Coll<QuestionOption>,
    counters: Coll<Counter>,
}

impl QuestionStore {
    pub fn from_db(db: &Database) -> Self {
        Self {
            questions: Coll::from_db(db),
            options: Coll::from_db(db),
            counters: Coll::from_db(db),
        }
    }

    /// Insert a new question row and return it with its assigned ID.
    pub async fn create_question(
        &self,
        txn: &mut Txn,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Question> {
        let question = Question {
            id: Counter::next(&self.counters, QUESTION_ID_COUNTER).await?,
            question_text: text.to_string(),
            created_at,
        };
        self.questions
            .insert_one_with_session(&question, None, txn.session())
            .await?;
        Ok(question)
    }

    /// Insert one option row. The caller is responsible for keeping
    /// `position_index` dense and unique within the question.
    pub async fn create_option(
        &self,
        txn: &mut Txn,
        question_id: QuestionId,
        text: &str,
        position_index: PositionIndex,
        is_correct: bool,
        created_at: DateTime<Utc>,
    ) -> Result<OptionId> {
        let option = QuestionOption {
            id: Counter::next(&self.counters, OPTION_ID_COUNTER).await?,
            question_id,
            option_text: text.to_string(),
            position_index,
            is_correct,
            created_at,
        };
        self.options
            .insert_one_with_session(&option, None, txn.session())
            .await?;
        Ok(option.id)
    }

    pub async fn update_question_text(
        &self,
        txn: &mut Txn,
        id: QuestionId,
        text: &str,
    ) -> Result<()> {
        let update = doc! {
            "$set": { "question_text": text }
        };
        let result = self
            .questions
            .update_one_with_session(id_filter(id), update, None, txn.session())
            .await?;
        // Matched rather than modified: rewriting identical text is still a success.
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("Question {id}")));
        }
        Ok(())
    }

    /// Delete every option of the given question, returning how many went.
    /// Deleting from a question with no options is not an error.
    pub async fn delete_options_by_question(&self, txn: &mut Txn, id: QuestionId) -> Result<u64> {
        let result = self
            .options
            .delete_many_with_session(question_id_filter(id), None, txn.session())
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn delete_question(&self, txn: &mut Txn, id: QuestionId) -> Result<()> {
        let result = self
            .questions
            .delete_one_with_session(id_filter(id), None, txn.session())
            .await?;
        if result.deleted_count == 0 {
            return Err(Error::not_found(format!("Question {id}")));
        }
        Ok(())
    }

    /// All questions, oldest first. Equal timestamps fall back to ID order.
    pub async fn fetch_all_questions(&self) -> std::result::Result<Vec<Question>, DbError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();
        self.questions.find(None, options).await?.try_collect().await
    }

    pub async fn fetch_question(
        &self,
        id: QuestionId,
    ) -> std::result::Result<Option<Question>, DbError> {
        self.questions.find_one(id_filter(id), None).await
    }

    /// The options of the given question, ordered by position.
    pub async fn fetch_options_by_question(
        &self,
        id: QuestionId,
    ) -> std::result::Result<Vec<QuestionOption>, DbError> {
        let options = FindOptions::builder()
            .sort(doc! { "position_index": 1 })
            .build();
        self.options
            .find(question_id_filter(id), options)
            .await?
            .try_collect()
            .await
    }
}
