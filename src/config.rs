//! `archgen.toml` loading. Every field has a default, so an absent file is
//! equivalent to an empty one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::llm::{validate_api_key, LlmError};
use crate::sandbox::{SandboxPolicy, DEFAULT_TIMEOUT};

pub const CONFIG_FILE: &str = "archgen.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub timeout_secs: u64,
    pub runtime: RuntimeSettings,
    pub sandbox: SandboxPolicy,
    pub llm: LlmSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            runtime: RuntimeSettings::default(),
            sandbox: SandboxPolicy::default(),
            llm: LlmSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Interpreter used to run generated scripts, looked up on `PATH`.
    pub interpreter: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Environment variable holding the API key. The key itself never lives in config.
    pub api_key_env: String,
    pub base_url: String,
    pub code_model: String,
    pub image_model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            code_model: "gemini-2.0-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Load from `path`, or from `./archgen.toml` when it exists, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let local = PathBuf::from(CONFIG_FILE);
                if !local.is_file() {
                    return Ok(Self::default());
                }
                local
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        if self.runtime.interpreter.trim().is_empty() {
            bail!("runtime.interpreter must not be empty");
        }
        if self.llm.request_timeout_secs == 0 {
            bail!("llm.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reads the API key from the environment, after loading `.env` if present.
    pub fn api_key(&self) -> Result<String, LlmError> {
        let _ = dotenvy::dotenv();
        let key = std::env::var(&self.llm.api_key_env).ok();
        validate_api_key(key.as_deref(), &self.llm.api_key_env)
    }
}
