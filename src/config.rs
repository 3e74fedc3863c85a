//! Application configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `CHALLENGER_*` environment variables (`CHALLENGER_BROWSER__HEADLESS=false`
//! and friends).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub nav_timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CaptchaConfig {
    /// Empty key leaves the solver unconfigured (NoopCaptchaSolver).
    pub api_key: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    pub evidence_root: PathBuf,
    pub recipes_root: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub captcha: CaptchaConfig,
    pub storage: StorageConfig,
    pub retry: RetryConfig,
}

impl AppConfig {
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("browser.headless", true)?
            .set_default("browser.nav_timeout_secs", 30)?
            .set_default("captcha.api_key", "")?
            .set_default("captcha.endpoint", "https://captcha-solver.internal/solve")?
            .set_default("captcha.timeout_secs", 120)?
            .set_default("storage.evidence_root", "./data/evidence")?
            .set_default("storage.recipes_root", "./data/recipes")?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.delay_secs", 5)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CHALLENGER")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.browser.nav_timeout_secs)
    }

    pub fn captcha_timeout(&self) -> Duration {
        Duration::from_secs(self.captcha.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry.delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_file() {
        let config = AppConfig::load(None).unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.captcha.api_key.is_empty());
    }
}
