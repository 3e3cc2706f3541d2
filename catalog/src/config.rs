use std::{env, fs, net::SocketAddr, str::FromStr};

use anyhow::{anyhow, Context};
use blob_store::BlobConfig;
use http::HeaderValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub blob: BlobConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
    /// Allowed origins when cors is enabled, empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Largest request body accepted, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Http {
    pub fn allowed_origins(&self) -> anyhow::Result<Vec<HeaderValue>> {
        self.cors_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid cors origin '{origin}'"))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("5000"))
    ))
    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 5000)))
}

fn default_body_limit() -> usize {
    512 * 1024 * 1024
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
            cors_origins: Default::default(),
            body_limit: default_body_limit(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://database.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    8
}

impl Config {
    pub fn parse(path: Option<String>) -> anyhow::Result<Self> {
        let result = fs::read_to_string(path.unwrap_or(String::from("vidcat.toml")))
            .or(fs::read_to_string("/etc/vidcat/vidcat.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str()).context("config parse error")?;
        cfg.validate()
            .map_err(|err| anyhow!("config validate [{}]", err))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.http.allowed_origins()?;
        if self.http.body_limit == 0 {
            return Err(anyhow!("http body_limit must be greater than 0"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow!("database max_connections must be greater than 0"));
        }
        self.blob.validate()
    }
}
