use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

/// Errors that are critical to the entire server.
#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    RocketError(#[from] RocketError),
}

async fn run() -> Result<(), Error> {
    info!("Configuring server...");
    let rocket = question_bank::build().ignite().await?;
    info!("...server configured!");
    // Our own fairing reports liftoff; silence rocket's logging from now on.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let _ = rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    // Set up logging.
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    info!("Initialised logging");

    // Launch server.
    if let Err(err) = run().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}

#[cfg(test)]
mod tests {
    use log4rs::config::load_config_file;

    /// Silencing Rocket after launch must leave our own console output alone.
    #[test]
    fn rocket_console_output_is_separate() {
        let config = load_config_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
            .expect("log4rs.yaml should parse");

        let appender = |name: &str| {
            config
                .appenders()
                .iter()
                .find(|a| a.name() == name)
                .unwrap_or_else(|| panic!("missing appender {name}"))
        };
        assert!(appender("stdout").filters().is_empty());
        assert_eq!(appender("rocket_stdout").filters().len(), 1);

        assert!(config.root().appenders().contains(&"stdout".to_string()));
        assert!(!config
            .root()
            .appenders()
            .contains(&"rocket_stdout".to_string()));

        let rocket = config
            .loggers()
            .iter()
            .find(|l| l.name() == "rocket")
            .expect("missing rocket logger");
        assert!(!rocket.additive());
        assert!(rocket.appenders().contains(&"rocket_stdout".to_string()));
        assert!(!rocket.appenders().contains(&"stdout".to_string()));
    }
}
