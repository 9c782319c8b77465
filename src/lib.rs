#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;
use config::{ConfigFairing, DatabaseFairing};
use cors::CorsFairing;
use logging::LoggerFairing;

/// Build the server, connecting to the database configured in the figment.
pub fn build() -> Rocket<Build> {
    rocket_without_db().attach(DatabaseFairing)
}

/// Everything except the database connection.
fn rocket_without_db() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(CorsFairing)
        .mount("/", cors::routes())
}

/// Connect to the database server named by `db_uri` in the default figment.
#[cfg(test)]
async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .unwrap_or_else(|e| panic!("Could not connect to database at \"{db_uri}\": {e}"))
}

/// Get a fresh database name for a test.
#[cfg(test)]
fn database() -> String {
    config::test_database_name()
}

/// Build a server that uses the given database instead of connecting its own.
#[cfg(test)]
async fn rocket_for_db(db_client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = db_client.database(db_name);
    config::prepare_database(&db)
        .await
        .expect("Failed to prepare test database");
    rocket_without_db().manage(db_client).manage(db)
}
