//! Interactive startup for the server.
//!
//! Environment settings become prompt defaults; the answers go straight
//! into a [`ServerConfig`].

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::ServerConfig;

/// Answers collected from the prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Answers {
    bind_addr: String,
    port: u16,
    model_path: String,
    locations_db: String,
}

impl Answers {
    fn defaults(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            port: config.port,
            model_path: config.model_path.display().to_string(),
            locations_db: config.locations_db.display().to_string(),
        }
    }

    /// Overrides the prompted fields of `base`, keeping the rest.
    fn apply(self, base: ServerConfig) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr,
            port: self.port,
            model_path: PathBuf::from(self.model_path),
            locations_db: PathBuf::from(self.locations_db),
            ..base
        }
    }
}

fn prompt(defaults: Answers) -> dialoguer::Result<Answers> {
    Ok(Answers {
        bind_addr: Input::new()
            .with_prompt("Bind address")
            .default(defaults.bind_addr)
            .interact_text()?,
        port: Input::new()
            .with_prompt("Port")
            .default(defaults.port)
            .interact_text()?,
        model_path: Input::new()
            .with_prompt("Model file")
            .default(defaults.model_path)
            .interact_text()?,
        locations_db: Input::new()
            .with_prompt("Locations database")
            .default(defaults.locations_db)
            .interact_text()?,
    })
}

/// Prompts for the listen address, model and database, then serves.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the terminal cannot be read or
/// the server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Accident Risk Server");
    println!();

    let base = ServerConfig::from_env();
    let answers = prompt(Answers::defaults(&base)).map_err(std::io::Error::other)?;
    let config = answers.apply(base);

    let start = Confirm::new()
        .with_prompt(format!(
            "Serve {} on {}:{}?",
            config.model_path.display(),
            config.bind_addr,
            config.port
        ))
        .default(true)
        .interact()
        .map_err(std::io::Error::other)?;
    if !start {
        return Ok(());
    }

    super::serve(config).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn answers_replace_only_prompted_fields() {
        let base = ServerConfig {
            model_data_limit: None,
            db_timeout: Duration::from_secs(3),
            ..ServerConfig::default()
        };
        let mut answers = Answers::defaults(&base);
        answers.bind_addr = "0.0.0.0".to_string();
        answers.port = 9000;
        answers.model_path = "models/la.json".to_string();

        let config = answers.apply(base.clone());
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.model_path, PathBuf::from("models/la.json"));
        assert_eq!(config.locations_db, base.locations_db);
        assert_eq!(config.sample_data, base.sample_data);
        assert_eq!(config.model_data_limit, None);
        assert_eq!(config.db_timeout, Duration::from_secs(3));
    }

    #[test]
    fn unchanged_defaults_round_trip() {
        let base = ServerConfig::default();
        assert_eq!(Answers::defaults(&base).apply(base.clone()), base);
    }
}
