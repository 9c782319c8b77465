use mongodb::Database;
use rocket::{
    outcome::try_outcome,
    request::{self, FromRequest, Request},
    State,
};

use crate::error::{Error, Result};
use crate::model::{
    common::QuestionId,
    db::{Question, QuestionStore},
};

use super::QuestionWithOptions;

/// Assembles questions together with their ordered options.
///
/// No transaction is opened. If any statement fails, the whole read fails;
/// partial listings are never returned.
#[derive(Clone)]
pub struct QuestionReader {
    store: QuestionStore,
}

impl QuestionReader {
    pub fn new(db: &Database) -> Self {
        Self {
            store: QuestionStore::from_db(db),
        }
    }

    /// Every question, oldest first.
    pub async fn all(&self) -> Result<Vec<QuestionWithOptions>> {
        let questions = self
            .store
            .fetch_all_questions()
            .await
            .map_err(Error::Read)?;
        let mut listing = Vec::with_capacity(questions.len());
        for question in questions {
            listing.push(self.with_options(question).await?);
        }
        Ok(listing)
    }

    pub async fn one(&self, id: QuestionId) -> Result<QuestionWithOptions> {
        let question = self
            .store
            .fetch_question(id)
            .await
            .map_err(Error::Read)?
            .ok_or_else(|| Error::not_found(format!("Question {id}")))?;
        self.with_options(question).await
    }

    async fn with_options(&self, question: Question) -> Result<QuestionWithOptions> {
        let options = self
            .store
            .fetch_options_by_question(question.id)
            .await
            .map_err(Error::Read)?;
        Ok(QuestionWithOptions { question, options })
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for QuestionReader {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = try_outcome!(req.guard::<&State<Database>>().await);
        request::Outcome::Success(QuestionReader::new(db))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::question::{QuestionParams, QuestionWriter};

    use super::*;

    #[backend_test]
    async fn empty_bank(reader: QuestionReader) {
        assert!(reader.all().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn listing_includes_options(writer: QuestionWriter, reader: QuestionReader) {
        let first = writer.create(QuestionParams::example()).await.unwrap();
        let second = writer
            .create(QuestionParams::edited_example())
            .await
            .unwrap();

        let listing = reader.all().await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].question.id, first);
        assert_eq!(listing[0].options.len(), 2);
        assert_eq!(listing[1].question.id, second);
        assert_eq!(listing[1].options.len(), 1);
        for entry in &listing {
            assert!(entry
                .options
                .iter()
                .all(|o| o.question_id == entry.question.id));
        }
    }

    #[backend_test]
    async fn missing_question(reader: QuestionReader) {
        assert!(matches!(reader.one(1).await, Err(Error::NotFound(_))));
    }
}
