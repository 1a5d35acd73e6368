//! Configuration
//!
//! Query-time settings ([`ChainConfig`]) are validated on construction, so a
//! chain never sees a temperature outside `[0, 1]` or a top-k of zero.
//! Filesystem locations and credentials come from [`Settings`] and
//! [`Credentials`].

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::llm::Model;
use crate::{Error, Result};

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const DATA_DIR_VAR: &str = "DOCCHAT_DATA_DIR";
pub const STORAGE_DIR_VAR: &str = "DOCCHAT_STORAGE_DIR";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STORAGE_DIR: &str = "storage/index";

/// Sampling temperature in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f32);

impl Temperature {
    pub const DEFAULT: Temperature = Temperature(0.2);

    pub fn new(value: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(Error::InvalidInput(format!(
                "temperature must be between 0 and 1, got {value}"
            )));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Number of fragments retrieved per question, at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopK(usize);

impl TopK {
    pub const DEFAULT: TopK = TopK(4);

    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(Error::InvalidInput("top-k must be at least 1".to_string()));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for TopK {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for TopK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings read by the answer chain on every query.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChainConfig {
    pub model: Model,
    pub temperature: Temperature,
    pub top_k: TopK,
}

/// Where documents are read from and the index is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub storage_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
        }
    }
}

/// Provider credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "{API_KEY_VAR} is not set. Create one at https://aistudio.google.com/app/apikey and put it in .env or your environment"
            )));
        }
        Ok(Self { api_key })
    }

    /// Read the API key from `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(env::var(API_KEY_VAR).unwrap_or_default())
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("api_key", &"<redacted>").finish()
    }
}
