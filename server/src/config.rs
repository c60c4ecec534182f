//! Process configuration, loaded once at startup.

use anyhow::{Context, Result};

/// Environment-derived configuration. Every knob the process reads is
/// enumerated here; nothing else consults the environment after boot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP/WebSocket listener binds on.
    pub port: u16,
    /// Shared secret every WebSocket client must present at handshake.
    pub api_key: String,
    /// Origin allowed through CORS (the web client).
    pub allowed_origin: String,
    /// Postgres connection string.
    pub database_url: String,
    /// Base URL of the HLTV-style match data API.
    pub hltv_api_base: String,
    /// Team name used to filter upstream match data.
    pub team_name: String,
}

impl Config {
    /// Read configuration from the environment. The shared secret is the
    /// one hard requirement; everything else has a development default.
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid port number")?;

        let api_key =
            std::env::var("CHAT_API_KEY").context("CHAT_API_KEY must be set (shared client secret)")?;

        let allowed_origin =
            std::env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/fanzone".to_string());

        let hltv_api_base = std::env::var("HLTV_API_BASE")
            .unwrap_or_else(|_| "https://hltv-api.vercel.app/api".to_string());

        let team_name = std::env::var("TEAM_NAME").unwrap_or_else(|_| "FURIA".to_string());

        Ok(Self {
            port,
            api_key,
            allowed_origin,
            database_url,
            hltv_api_base,
            team_name,
        })
    }
}
