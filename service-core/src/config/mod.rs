//! Shared configuration loading.
//!
//! Services layer their own env-driven settings on top of this core;
//! `Config` carries only what every service binary has.

use crate::error::AppError;
use config::{Config as Loader, Environment, File};
use serde::Deserialize;

/// Settings common to every service.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// HTTP listen port. Port 0 asks the OS for a free port, which the
    /// test harness relies on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load from an optional `configuration` file, with `COMMERCE__`-prefixed
    /// environment overrides on top.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let loaded = Loader::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(Environment::with_prefix("COMMERCE").separator("__"))
            .build()?;

        Ok(loaded.try_deserialize()?)
    }
}
