//! Configuration
//!
//! [`ConfigService`] is a flat key/value store seeded from the process
//! environment. [`LoaderConfig`] is the typed view the
//! [`ServiceLoader`](crate::loader::ServiceLoader) reads, built either from
//! `LOADOUT_*` keys or from a JSON document.

use crate::error::{Result, ServiceError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Key/value configuration store
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Seeded from the process environment
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Accepts `true/false`, `1/0`, `yes/no` and `on/off`
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(invalid(key, &raw)),
        }
    }

    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|raw| raw.trim().parse::<T>().map_err(|_| invalid(key, &raw)))
            .transpose()
    }
}

fn invalid(key: &str, raw: &str) -> ServiceError {
    ServiceError::configuration(format!("invalid value '{}' for {}", raw, key))
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("keys", &self.config.len())
            .finish()
    }
}

/// Loader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Release the loader's inputs once services are ready
    pub dispose_after_load: bool,
    /// Context the loader registers into; empty is the default context
    pub default_context: String,
    /// Root of the default resource path `<resource_root>/<InterfaceName>`
    pub resource_root: String,
    /// Log per-service progress at info instead of debug
    pub debug_load: bool,
    /// Fail the load when a single service takes longer to initialize
    pub init_timeout_ms: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            dispose_after_load: false,
            default_context: String::new(),
            resource_root: "Services".to_string(),
            debug_load: false,
            init_timeout_ms: None,
        }
    }
}

impl LoaderConfig {
    pub const DISPOSE_AFTER_LOAD: &'static str = "LOADOUT_DISPOSE_AFTER_LOAD";
    pub const DEFAULT_CONTEXT: &'static str = "LOADOUT_DEFAULT_CONTEXT";
    pub const RESOURCE_ROOT: &'static str = "LOADOUT_RESOURCE_ROOT";
    pub const DEBUG_LOAD: &'static str = "LOADOUT_DEBUG_LOAD";
    pub const INIT_TIMEOUT_MS: &'static str = "LOADOUT_INIT_TIMEOUT_MS";

    /// Read `LOADOUT_*` keys, keeping defaults for the ones not set
    pub fn from_service(config: &ConfigService) -> Result<Self> {
        let mut loader = Self::default();
        if let Some(dispose) = config.get_bool(Self::DISPOSE_AFTER_LOAD)? {
            loader.dispose_after_load = dispose;
        }
        if let Some(context) = config.get(Self::DEFAULT_CONTEXT) {
            loader.default_context = context;
        }
        if let Some(root) = config.get(Self::RESOURCE_ROOT) {
            loader.resource_root = root;
        }
        if let Some(debug) = config.get_bool(Self::DEBUG_LOAD)? {
            loader.debug_load = debug;
        }
        if let Some(timeout) = config.get_parsed::<u64>(Self::INIT_TIMEOUT_MS)? {
            loader.init_timeout_ms = Some(timeout);
        }
        Ok(loader)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_service(&ConfigService::new())
    }

    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout_ms.map(Duration::from_millis)
    }
}
