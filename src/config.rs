use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::uri::Origin,
    Build, Rocket,
};
use serde::Deserialize;

use crate::error::Result;
use crate::model::mongodb::{ensure_counters_exist, ensure_indexes_exist, Coll};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_prefix")]
    api_prefix: String,
    #[serde(default = "default_cors_allowed_origins")]
    cors_allowed_origins: Vec<String>,
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_cors_allowed_origins() -> Vec<String> {
    vec!["http://*".to_string(), "https://*".to_string()]
}

impl Config {
    /// Path prefix the API is mounted under, e.g. `/api/v1`.
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// Origins allowed to make cross-origin requests. A trailing `*` matches
    /// any suffix.
    pub fn cors_allowed_origins(&self) -> &[String] {
        &self.cors_allowed_origins
    }
}

/// A fairing that loads the application config, puts it in managed state,
/// and mounts the API under the configured prefix.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Mounting an invalid base panics, so check it first.
        let base = match Origin::parse_owned(config.api_prefix.clone()) {
            Ok(base) => base,
            Err(e) => {
                error!("Invalid `api_prefix` {:?}: {e}", config.api_prefix);
                return Err(rocket);
            }
        };
        info!("Mounting API under {base}");

        rocket = rocket.mount(base, crate::api::routes()).manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: String,
}

fn default_db_name() -> String {
    "question_bank".to_string()
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        if let Err(e) = prepare_database(&db).await {
            error!("Failed to prepare database {}: {e}", config.db_name);
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Ensure the indexes and ID counters the question bank relies on exist.
///
/// This operation is idempotent.
pub async fn prepare_database(db: &Database) -> Result<()> {
    ensure_indexes_exist(db).await?;
    ensure_counters_exist(&Coll::from_db(db)).await?;
    Ok(())
}

/// Get a database name for a test. Random to avoid collisions between tests.
#[cfg(test)]
pub fn test_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}
