//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Field names match what the editor frontend sends and expects.
//! - Datetimes are serialised as RFC 3339 strings.
//! - Option positions are implied by array order and never exposed.

mod message;
mod question;

pub use message::Message;
pub use question::{OptionPayload, OptionResponse, QuestionPayload, QuestionResponse};
