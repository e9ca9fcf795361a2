use crate::error::CliError;
use std::{collections::HashMap, fs, path::Path};
use tracing::debug;

/// Substrings marking a variable whose value must never be logged.
const SENSITIVE_PATTERNS: &[&str] = &["password", "passwd", "secret", "token", "key", "auth"];

/// Variables available to `${VAR}` placeholders in the settings file: the
/// process environment, overlaid by an optional `.env` file.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Load variables from a .env file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)?;
        Ok(())
    }

    /// Loads `path` when it exists. Returns whether a file was read.
    pub fn load_if_present<P: AsRef<Path>>(&mut self, path: P) -> Result<bool, CliError> {
        if !path.as_ref().exists() {
            return Ok(false);
        }
        self.load_from_file(path)?;
        Ok(true)
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.vars
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);

            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            let value = Self::unquote_value(value);
            debug!(key, value = %Self::display_value(key, &value), "Loaded env variable");
            self.vars.insert(key.to_string(), value);
        }

        Ok(())
    }

    /// Strips matching quotes. Unquoted values lose a trailing ` # comment`.
    fn unquote_value(value: &str) -> String {
        let value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }
        match value.find(" #") {
            Some(pos) => value[..pos].trim_end().to_string(),
            None => value.to_string(),
        }
    }

    fn is_sensitive(key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        SENSITIVE_PATTERNS.iter().any(|p| key.contains(p))
    }

    fn display_value<'a>(key: &str, value: &'a str) -> &'a str {
        if Self::is_sensitive(key) { "***" } else { value }
    }
}
