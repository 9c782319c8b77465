mod bson;
mod collection;
mod counter;
mod txn;

pub use bson::{id_filter, question_id_filter};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{ensure_counters_exist, Counter, OPTION_ID_COUNTER, QUESTION_ID_COUNTER};
pub use txn::Txn;
