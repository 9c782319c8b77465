use chrono::{DateTime, Utc};
use log::{debug, warn};
use mongodb::{bson::DateTime as BsonDateTime, Client, Database};
use rocket::{
    outcome::try_outcome,
    request::{self, FromRequest, Request},
    State,
};

use crate::error::{Error, Result};
use crate::model::{
    common::{positions, QuestionId},
    db::QuestionStore,
    mongodb::Txn,
};

use super::{OptionParams, QuestionParams};

/// Creates, edits and deletes questions.
///
/// Every operation runs in its own transaction: after it returns, either all
/// of its rows are visible or none are. Options are never patched in place;
/// an edit replaces the whole set, so the stored options are always exactly
/// the list submitted by the last successful write.
#[derive(Clone)]
pub struct QuestionWriter {
    client: Client,
    store: QuestionStore,
}

impl QuestionWriter {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            store: QuestionStore::from_db(db),
        }
    }

    /// Create a question with its options, returning the new question's ID.
    pub async fn create(&self, params: QuestionParams) -> Result<QuestionId> {
        validate(&params)?;
        let mut txn = Txn::begin(&self.client).await?;
        let result = self.insert(&mut txn, &params).await;
        finish(txn, result, "create question").await
    }

    /// Replace the text and the entire option set of an existing question.
    pub async fn edit(&self, id: QuestionId, params: QuestionParams) -> Result<()> {
        validate(&params)?;
        let mut txn = Txn::begin(&self.client).await?;
        let result = self.replace(&mut txn, id, &params).await;
        finish(txn, result, &format!("edit question {id}")).await
    }

    /// Delete a question and all of its options.
    pub async fn delete(&self, id: QuestionId) -> Result<()> {
        let mut txn = Txn::begin(&self.client).await?;
        let result = self.remove(&mut txn, id).await;
        finish(txn, result, &format!("delete question {id}")).await
    }

    async fn insert(&self, txn: &mut Txn, params: &QuestionParams) -> Result<QuestionId> {
        let now = now();
        let question = self.store.create_question(txn, &params.text, now).await?;
        self.insert_options(txn, question.id, &params.options, now)
            .await?;
        Ok(question.id)
    }

    async fn replace(&self, txn: &mut Txn, id: QuestionId, params: &QuestionParams) -> Result<()> {
        self.store
            .update_question_text(txn, id, &params.text)
            .await?;
        self.store.delete_options_by_question(txn, id).await?;
        self.insert_options(txn, id, &params.options, now()).await
    }

    async fn remove(&self, txn: &mut Txn, id: QuestionId) -> Result<()> {
        self.store.delete_question(txn, id).await?;
        self.store.delete_options_by_question(txn, id).await?;
        Ok(())
    }

    /// Insert options at positions `1..=N` in the order given.
    async fn insert_options(
        &self,
        txn: &mut Txn,
        question_id: QuestionId,
        options: &[OptionParams],
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        for (option, position) in options.iter().zip(positions(options.len())) {
            self.store
                .create_option(
                    txn,
                    question_id,
                    &option.text,
                    position,
                    option.is_correct,
                    created_at,
                )
                .await?;
        }
        Ok(())
    }
}

/// Reject payloads the store would accept but the bank should not hold.
/// Empty option lists are allowed; blank question text is not.
fn validate(params: &QuestionParams) -> Result<()> {
    if params.text.trim().is_empty() {
        return Err(Error::validation("Question text must not be empty"));
    }
    Ok(())
}

/// Commit on success; roll back on failure and surface the original error.
async fn finish<T>(txn: Txn, result: Result<T>, action: &str) -> Result<T> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            debug!("Committed: {action}");
            Ok(value)
        }
        Err(err) => {
            warn!("Rolling back {action}: {err}");
            if let Err(abort_err) = txn.rollback().await {
                warn!("Rollback of {action} failed: {abort_err}");
            }
            Err(err)
        }
    }
}

/// Current time, truncated to the store's millisecond precision.
fn now() -> DateTime<Utc> {
    BsonDateTime::now().to_chrono()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for QuestionWriter {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let client = try_outcome!(req.guard::<&State<Client>>().await);
        let db = try_outcome!(req.guard::<&State<Database>>().await);
        request::Outcome::Success(QuestionWriter::new(client.inner().clone(), db))
    }
}

#[cfg(test)]
mod tests {
    use mongodb::Client as MongoClient;
    use rocket::tokio;

    use crate::model::question::{QuestionReader, QuestionWithOptions};

    use super::*;

    /// Larger than MongoDB's 16MiB document limit, so inserting it fails.
    fn oversized_text() -> String {
        "x".repeat(16 * 1024 * 1024 + 1)
    }

    fn summary(question: &QuestionWithOptions) -> Vec<(&str, u32, bool)> {
        question
            .options
            .iter()
            .map(|o| (o.option_text.as_str(), o.position_index, o.is_correct))
            .collect()
    }

    #[test]
    fn blank_text_is_invalid() {
        let mut params = QuestionParams::example();
        assert!(validate(&params).is_ok());

        params.text = " \n\t".to_string();
        assert!(matches!(validate(&params), Err(Error::Validation(_))));
    }

    #[test]
    fn empty_options_are_valid() {
        let params = QuestionParams {
            text: "Open question".to_string(),
            options: vec![],
        };
        assert!(validate(&params).is_ok());
    }

    #[backend_test]
    async fn create_assigns_positions_in_order(writer: QuestionWriter, reader: QuestionReader) {
        let id = writer.create(QuestionParams::example()).await.unwrap();

        let question = reader.one(id).await.unwrap();
        assert_eq!(question.question.question_text, "2+2=?");
        assert_eq!(summary(&question), vec![("3", 1, false), ("4", 2, true)]);
    }

    #[backend_test]
    async fn create_without_options(writer: QuestionWriter, reader: QuestionReader) {
        let params = QuestionParams {
            text: "No options yet".to_string(),
            options: vec![],
        };
        let id = writer.create(params).await.unwrap();
        assert!(reader.one(id).await.unwrap().options.is_empty());
    }

    #[backend_test]
    async fn create_rejects_blank_text(writer: QuestionWriter, reader: QuestionReader) {
        let mut params = QuestionParams::example();
        params.text = "   ".to_string();
        let result = writer.create(params).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(reader.all().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn failed_create_leaves_nothing(writer: QuestionWriter, reader: QuestionReader) {
        let mut params = QuestionParams::example();
        params.options.push(OptionParams {
            text: oversized_text(),
            is_correct: false,
        });

        let result = writer.create(params).await;
        assert!(matches!(result, Err(Error::Persistence(_))));
        assert!(reader.all().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn edit_replaces_all_options(writer: QuestionWriter, reader: QuestionReader) {
        let id = writer.create(QuestionParams::example()).await.unwrap();
        let before = reader.one(id).await.unwrap();

        writer
            .edit(id, QuestionParams::edited_example())
            .await
            .unwrap();

        let after = reader.one(id).await.unwrap();
        assert_eq!(summary(&after), vec![("5", 1, false)]);
        // Full replace: none of the old option rows survive.
        for old in &before.options {
            assert!(after.options.iter().all(|new| new.id != old.id));
        }
        assert_eq!(after.question.created_at, before.question.created_at);
    }

    #[backend_test]
    async fn edit_updates_text(writer: QuestionWriter, reader: QuestionReader) {
        let id = writer.create(QuestionParams::example()).await.unwrap();
        let mut params = QuestionParams::example();
        params.text = "What is 2+2?".to_string();
        params.options.reverse();

        writer.edit(id, params).await.unwrap();

        let after = reader.one(id).await.unwrap();
        assert_eq!(after.question.question_text, "What is 2+2?");
        assert_eq!(summary(&after), vec![("4", 1, true), ("3", 2, false)]);
    }

    #[backend_test]
    async fn edit_missing_question(writer: QuestionWriter, reader: QuestionReader) {
        let result = writer.edit(999, QuestionParams::example()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        // The options must not have been inserted for a phantom question.
        assert!(reader.all().await.unwrap().is_empty());
        assert!(matches!(reader.one(999).await, Err(Error::NotFound(_))));
    }

    #[backend_test]
    async fn failed_edit_keeps_previous_generation(writer: QuestionWriter, reader: QuestionReader) {
        let id = writer.create(QuestionParams::example()).await.unwrap();
        let before = reader.one(id).await.unwrap();

        let mut params = QuestionParams::edited_example();
        params.text = "Changed".to_string();
        params.options.push(OptionParams {
            text: oversized_text(),
            is_correct: true,
        });
        let result = writer.edit(id, params).await;
        assert!(matches!(result, Err(Error::Persistence(_))));

        let after = reader.one(id).await.unwrap();
        assert_eq!(after, before);
    }

    #[backend_test]
    async fn delete_removes_options(writer: QuestionWriter, reader: QuestionReader, db: Database) {
        let id = writer.create(QuestionParams::example()).await.unwrap();
        let kept = writer.create(QuestionParams::edited_example()).await.unwrap();

        writer.delete(id).await.unwrap();

        assert!(matches!(reader.one(id).await, Err(Error::NotFound(_))));
        let store = QuestionStore::from_db(&db);
        assert!(store.fetch_options_by_question(id).await.unwrap().is_empty());
        // Other questions are untouched.
        assert_eq!(reader.one(kept).await.unwrap().options.len(), 1);
    }

    #[backend_test]
    async fn delete_missing_question(writer: QuestionWriter) {
        let result = writer.delete(12345).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[backend_test]
    async fn concurrent_edits_do_not_interleave(
        writer: QuestionWriter,
        reader: QuestionReader,
        mongo: MongoClient,
        db: Database,
    ) {
        let id = writer.create(QuestionParams::example()).await.unwrap();

        let first = QuestionParams {
            text: "First".to_string(),
            options: vec![
                OptionParams::new("a1", true),
                OptionParams::new("a2", false),
                OptionParams::new("a3", false),
            ],
        };
        let second = QuestionParams {
            text: "Second".to_string(),
            options: vec![OptionParams::new("b1", false), OptionParams::new("b2", true)],
        };

        let other_writer = QuestionWriter::new(mongo, &db);
        let (first_result, second_result) = tokio::join!(
            writer.edit(id, first.clone()),
            other_writer.edit(id, second.clone())
        );
        // The store may reject the loser with a write conflict; it never merges them.
        assert!(first_result.is_ok() || second_result.is_ok());

        let after = reader.one(id).await.unwrap();
        let texts = after
            .options
            .iter()
            .map(|o| o.option_text.clone())
            .collect::<Vec<_>>();
        let positions = after
            .options
            .iter()
            .map(|o| o.position_index)
            .collect::<Vec<_>>();
        let expected = if after.question.question_text == "First" {
            &first
        } else {
            &second
        };
        let expected_texts = expected
            .options
            .iter()
            .map(|o| o.text.clone())
            .collect::<Vec<_>>();
        assert_eq!(texts, expected_texts);
        assert_eq!(positions, (1..=expected.options.len() as u32).collect::<Vec<_>>());
    }
}
