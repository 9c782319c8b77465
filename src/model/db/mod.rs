//! DB-compatible (e.g. de/serialisable) types, and the storage gateway over them.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - Datetimes are serialised in MongoDB's own format.

mod option;
pub use option::QuestionOption;

mod question;
pub use question::Question;

mod store;
pub use store::QuestionStore;
