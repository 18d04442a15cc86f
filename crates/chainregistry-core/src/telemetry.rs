//! Log subscriber setup for processes that embed a listener.
//!
//! The listener crates only emit `tracing` events and spans; nothing is
//! printed until the embedding binary installs a subscriber. [`init_tracing`]
//! installs one whose filter understands the listener's own components, so
//! an operator can turn on the per-log `route` spans without drowning in
//! debug output from every other module:
//!
//! ```rust,no_run
//! use chainregistry_core::telemetry::{init_tracing, Component, LogConfig};
//!
//! let config = LogConfig::default().with_component(Component::Router, "debug");
//! init_tracing(&config).expect("valid log directives");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ListenerError;

/// Listener components with their own log target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Page scheduling, live loop, state transitions.
    Listener,
    /// Per-log routing spans, ignored topics, subject-type warnings.
    Router,
    /// Contract address refreshes.
    Registry,
    /// Proxy publish/subscribe.
    Proxy,
}

impl Component {
    /// The `tracing` target prefix for this component.
    pub fn target(&self) -> &'static str {
        match self {
            Self::Listener => "chainregistry_evm::listener",
            Self::Router => "chainregistry_evm::router",
            Self::Registry => "chainregistry_evm::registry",
            Self::Proxy => "chainregistry_core::proxy",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Per-component level overrides.
    #[serde(default)]
    pub components: BTreeMap<Component, String>,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
    /// Let a set `RUST_LOG` replace the directives built from this config.
    #[serde(default)]
    pub env_override: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: BTreeMap::new(),
            json: false,
            env_override: false,
        }
    }
}

impl LogConfig {
    /// Override the level of one component.
    pub fn with_component(mut self, component: Component, level: impl Into<String>) -> Self {
        self.components.insert(component, level.into());
        self
    }

    /// The `EnvFilter` directive string, e.g. `"info,chainregistry_evm::router=debug"`.
    pub fn directives(&self) -> String {
        self.components
            .iter()
            .fold(self.level.clone(), |mut directives, (component, level)| {
                directives.push_str(&format!(",{component}={level}"));
                directives
            })
    }

    /// Build the filter. Malformed levels are a config error.
    pub fn filter(&self) -> Result<EnvFilter, ListenerError> {
        if self.env_override {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        EnvFilter::try_new(self.directives())
            .map_err(|e| ListenerError::Config(format!("log directives: {e}")))
    }
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` if a subscriber was already installed, so tests and
/// embedders that set up logging themselves can call this unconditionally.
pub fn init_tracing(config: &LogConfig) -> Result<bool, ListenerError> {
    let filter = config.filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry.with(fmt_layer::layer().json()).try_init().is_ok()
    } else {
        registry.with(fmt_layer::layer()).try_init().is_ok()
    };
    Ok(installed)
}
