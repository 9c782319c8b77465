use log::debug;
use rocket::{
    http::Status,
    serde::json::{self, Json},
    Route,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{Message, QuestionPayload, QuestionResponse},
    common::QuestionId,
    question::{QuestionReader, QuestionWriter},
};

pub fn routes() -> Vec<Route> {
    routes![
        get_questions,
        get_question,
        create_question,
        edit_question,
        delete_question,
    ]
}

/// A `questionID` path segment, which may not have parsed.
type IdParam<'a> = std::result::Result<QuestionId, &'a str>;

/// A JSON request body, which may not have parsed.
type Body<'a> = std::result::Result<Json<QuestionPayload>, json::Error<'a>>;

fn parse_id(param: IdParam<'_>) -> Result<QuestionId> {
    param.map_err(|raw| Error::validation(format!("Invalid question ID: {raw:?}")))
}

fn parse_body(body: Body<'_>) -> Result<QuestionPayload> {
    match body {
        Ok(payload) => Ok(payload.into_inner()),
        Err(e) => {
            debug!("Rejected question body: {e}");
            Err(Error::validation("Invalid request body"))
        }
    }
}

#[get("/questions")]
async fn get_questions(reader: QuestionReader) -> Result<Json<Vec<QuestionResponse>>> {
    let listing = reader.all().await?;
    Ok(Json(listing.into_iter().map(Into::into).collect()))
}

#[get("/questions/<question_id>")]
async fn get_question(
    question_id: IdParam<'_>,
    reader: QuestionReader,
) -> Result<Json<QuestionResponse>> {
    let question_id = parse_id(question_id)?;
    let question = reader.one(question_id).await?;
    Ok(Json(question.into()))
}

#[post("/questions", data = "<payload>")]
async fn create_question(
    payload: Body<'_>,
    writer: QuestionWriter,
) -> Result<(Status, Json<Message>)> {
    let payload = parse_body(payload)?;
    let id = writer.create(payload.into()).await?;
    Ok((
        Status::Created,
        Json(Message::with_id("Question created successfully", id)),
    ))
}

#[put("/questions/<question_id>", data = "<payload>")]
async fn edit_question(
    question_id: IdParam<'_>,
    payload: Body<'_>,
    writer: QuestionWriter,
) -> Result<Json<Message>> {
    let question_id = parse_id(question_id)?;
    let payload = parse_body(payload)?;
    writer.edit(question_id, payload.into()).await?;
    Ok(Json(Message::new("Question edited successfully")))
}

#[delete("/questions/<question_id>")]
async fn delete_question(question_id: IdParam<'_>, writer: QuestionWriter) -> Result<Json<Message>> {
    let question_id = parse_id(question_id)?;
    writer.delete(question_id).await?;
    Ok(Json(Message::new("Question deleted successfully")))
}
