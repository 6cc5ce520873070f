use crate::common::ResponseOptions;
use crate::error::{Result, TrellisError};
use dashmap::DashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

pub const HOST: &str = "HOST";
pub const PORT: &str = "PORT";
pub const BODY_LIMIT: &str = "TRELLIS_BODY_LIMIT";
pub const INCLUDE_CODE: &str = "TRELLIS_INCLUDE_CODE";
pub const PRINT_ROUTES: &str = "TRELLIS_PRINT_ROUTES";

/// Default cap on buffered request bodies, 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Key/value configuration store
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// A store seeded with the process environment.
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars_os() {
            if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
                service.set(key, value);
            }
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse `key` as `T`. Absent keys are `Ok(None)`.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| TrellisError::InvalidConfig {
                    key: key.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    }

    /// Parse `key` as a flag: `true/false`, `1/0`, `yes/no`, `on/off`.
    pub fn get_flag(&self, key: &str) -> Result<Option<bool>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(TrellisError::InvalidConfig {
                key: key.to_string(),
                value,
            }),
        }
    }
}

/// Settings of an [`App`](crate::App).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Largest request body, in bytes, read for a controller action.
    pub body_limit: usize,
    /// Repeat the status code as `code` inside JSON envelopes.
    pub include_code_in_body: bool,
    /// Log the route table when the server starts.
    pub print_routes: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            body_limit: DEFAULT_BODY_LIMIT,
            include_code_in_body: false,
            print_routes: true,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_service(&ConfigService::new())
    }

    pub fn from_service(config: &ConfigService) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: config.get(HOST).unwrap_or(defaults.host),
            port: config.get_parsed(PORT)?.unwrap_or(defaults.port),
            body_limit: config.get_parsed(BODY_LIMIT)?.unwrap_or(defaults.body_limit),
            include_code_in_body: config
                .get_flag(INCLUDE_CODE)?
                .unwrap_or(defaults.include_code_in_body),
            print_routes: config.get_flag(PRINT_ROUTES)?.unwrap_or(defaults.print_routes),
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn response_options(&self) -> ResponseOptions {
        ResponseOptions {
            include_code: self.include_code_in_body,
        }
    }
}
