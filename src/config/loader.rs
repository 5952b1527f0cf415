//! File loading and merging for cunningham configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{default_base_url, default_model, Config};
use crate::permissions::PermissionConfig;

impl Config {
    /// Loads the global config from `~/.config/cunningham/config.toml`.
    ///
    /// If no config file exists, creates one with sensible defaults
    /// (including an `{env:VAR}` placeholder for the API key) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = format!(
                r#"base_url = "{}"
model = "{}"
api_key = "{{env:{}}}"

[permissions.tools]
run_command = "ask"
"#,
                default_base_url(),
                default_model(),
                crate::constants::ENV_API_KEY,
            );
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            return Self::parse(&default_toml, &path);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::parse(&contents, &path)
    }

    /// Look for cunningham.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                let contents = fs::read_to_string(&candidate)
                    .with_context(|| format!("Failed to read config from {:?}", candidate))?;
                return Self::parse(&contents, &candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub(super) fn parse(contents: &str, path: &Path) -> Result<Self> {
        toml::from_str(contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let mut permissions: PermissionConfig = global.permissions;
        permissions.tools.extend(project.permissions.tools);

        Config {
            base_url: if project.base_url != default_base_url() {
                project.base_url
            } else {
                global.base_url
            },
            model: if project.model != default_model() {
                project.model
            } else {
                global.model
            },
            api_key: project.api_key.or(global.api_key),
            max_tokens: project.max_tokens.or(global.max_tokens),
            request_timeout_secs: project.request_timeout_secs.or(global.request_timeout_secs),
            max_tool_rounds: project.max_tool_rounds.or(global.max_tool_rounds),
            system_prompt: project.system_prompt.or(global.system_prompt),
            system_prompt_file: project.system_prompt_file.or(global.system_prompt_file),
            permissions,
        }
    }
}
