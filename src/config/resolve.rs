//! Environment substitution, overrides and derived settings.

use anyhow::{Context, Result};
use std::path::Path;

use super::types::Config;
use crate::constants::{
    ENV_API_KEY, ENV_BASE_URL, ENV_MODEL, MAX_TOKENS, MAX_TOOL_ROUNDS, REQUEST_TIMEOUT_SECS,
    SYSTEM_PROMPT_FILENAME,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        self.base_url = Self::resolve_str(&self.base_url);
        self.model = Self::resolve_str(&self.model);
        for field in [
            &mut self.api_key,
            &mut self.system_prompt,
            &mut self.system_prompt_file,
        ] {
            if let Some(ref mut value) = field {
                *value = Self::resolve_str(value);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// `OPENWEBUI_BASE_URL` and `OPENWEBUI_MODEL` override the files.
    pub(super) fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(model) = non_empty_env(ENV_MODEL) {
            self.model = model;
        }
    }

    /// Applies command-line overrides, which win over files and environment.
    pub fn apply_overrides(&mut self, model: Option<String>, base_url: Option<String>) {
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
    }

    /// Resolve the API key: env var first, then config value.
    pub fn resolve_api_key(&self) -> Option<String> {
        Self::pick_api_key(non_empty_env(ENV_API_KEY), self.api_key.as_deref())
    }

    fn pick_api_key(env_value: Option<String>, configured: Option<&str>) -> Option<String> {
        env_value.or_else(|| {
            configured
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
        })
    }

    pub fn max_tokens(&self) -> u64 {
        self.max_tokens.unwrap_or(MAX_TOKENS)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS)
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds.unwrap_or(MAX_TOOL_ROUNDS)
    }

    /// Returns the configured system prompt, if any.
    ///
    /// An inline `system_prompt` wins; otherwise `system_prompt_file` (or
    /// `prompt.txt` in `dir`) is read when it exists. A file named explicitly
    /// in the config must exist.
    pub fn load_system_prompt(&self, dir: &Path) -> Result<Option<String>> {
        if let Some(ref prompt) = self.system_prompt {
            return Ok(Some(prompt.clone()));
        }
        let (name, required) = match self.system_prompt_file {
            Some(ref file) => (file.as_str(), true),
            None => (SYSTEM_PROMPT_FILENAME, false),
        };
        let path = dir.join(name);
        if !required && !path.exists() {
            return Ok(None);
        }
        let prompt = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        Ok(Some(prompt))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
