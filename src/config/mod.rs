//! Configuration types and path resolution for cunningham.
//!
//! Settings are stored as TOML at the platform's XDG config path
//! (e.g. `~/.config/cunningham/config.toml` on Linux), optionally overridden
//! by a `cunningham.toml` in the project, then by `OPENWEBUI_*` environment
//! variables, then by command-line flags.

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;
use tracing::debug;

impl Config {
    /// Load config with precedence: environment > project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            debug!("merging project config");
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        config.apply_env();
        Ok(config)
    }
}
