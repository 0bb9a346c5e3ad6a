use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Path to the catalog YAML file (items plus image assets).
    pub catalog_path: PathBuf,
    /// Showcase transition timing.
    pub showcase: ShowcaseOptions,
    /// Style suggestion service settings.
    pub suggestions: SuggestionServiceOptions,
    /// Web shell bind settings.
    pub web: WebOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_yaml::from_str(&s)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.catalog_path.as_os_str().is_empty(),
            "catalog-path must be set"
        );
        self.showcase.validate()?;
        self.suggestions.validate()?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("catalog.yaml"),
            showcase: ShowcaseOptions::default(),
            suggestions: SuggestionServiceOptions::default(),
            web: WebOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ShowcaseOptions {
    /// Delay before the detail panel swaps to the newly selected car.
    #[serde(with = "humantime_serde")]
    pub swap_delay: Duration,
    /// Further delay before new selections are accepted again.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
}

impl ShowcaseOptions {
    const fn default_swap_delay() -> Duration {
        Duration::from_millis(250)
    }

    const fn default_settle_delay() -> Duration {
        Duration::from_millis(250)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.swap_delay > Duration::ZERO,
            "showcase.swap-delay must be positive"
        );
        ensure!(
            self.settle_delay > Duration::ZERO,
            "showcase.settle-delay must be positive"
        );
        Ok(())
    }
}

impl Default for ShowcaseOptions {
    fn default() -> Self {
        Self {
            swap_delay: Self::default_swap_delay(),
            settle_delay: Self::default_settle_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SuggestionServiceOptions {
    /// Endpoint of the style generation service.
    pub url: String,
    /// Optional bearer token for the service.
    pub auth_token: Option<String>,
    /// Optional per-request timeout; absent means the transport default.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl SuggestionServiceOptions {
    fn validate(&self) -> Result<()> {
        ensure!(!self.url.is_empty(), "suggestions.url must be set");
        Ok(())
    }
}

impl Default for SuggestionServiceOptions {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3400/style-suggestions".to_string(),
            auth_token: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WebOptions {
    pub bind_address: String,
    pub port: u16,
}

impl Default for WebOptions {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
