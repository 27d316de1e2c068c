//! Server configuration.

use std::time::Duration;

use gunduel_session::MatchConfig;
use serde::{Deserialize, Serialize};

use crate::GunduelError;

/// Everything needed to start a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Capacity of the coordinator's command channel. Connection handlers
    /// wait when it is full.
    pub command_buffer: usize,

    /// Rules for every session on this server.
    pub match_config: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            command_buffer: 1024,
            match_config: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds a config from the process environment.
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `GUNDUEL_ADDR` | full bind address |
    /// | `PORT` | binds `0.0.0.0:<PORT>` when `GUNDUEL_ADDR` is unset |
    /// | `GUNDUEL_TEARDOWN_SECS` | delay between a win and teardown |
    /// | `GUNDUEL_WIN_SCORE` | kills needed to win |
    ///
    /// # Errors
    /// [`GunduelError::InvalidConfig`] if a numeric variable doesn't parse.
    pub fn from_env() -> Result<Self, GunduelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GunduelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("GUNDUEL_ADDR") {
            config.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = parse("PORT", &port)?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(secs) = lookup("GUNDUEL_TEARDOWN_SECS") {
            config.match_config.teardown_delay =
                Duration::from_secs(parse("GUNDUEL_TEARDOWN_SECS", &secs)?);
        }
        if let Some(score) = lookup("GUNDUEL_WIN_SCORE") {
            let score: u32 = parse("GUNDUEL_WIN_SCORE", &score)?;
            if score == 0 {
                return Err(GunduelError::InvalidConfig {
                    key: "GUNDUEL_WIN_SCORE",
                    value: score.to_string(),
                });
            }
            config.match_config.win_score = score;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, GunduelError> {
    value.trim().parse().map_err(|_| GunduelError::InvalidConfig {
        key,
        value: value.to_string(),
    })
}
