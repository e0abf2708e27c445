use std::env;

const DATABASE_URL_VAR: &str = "CHATCORE_DATABASE_URL";
const DEFAULT_DATABASE_URL: &str = "sqlite://chatcore.db";

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
}

impl AppConfig {
    /// Reads the configuration from the environment, falling back to a
    /// database file in the working directory.
    pub fn from_env() -> Self {
        let database_url =
            env::var(DATABASE_URL_VAR).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        AppConfig { database_url }
    }
}
