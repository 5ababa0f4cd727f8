// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the command line tool.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Output settings shared by every subcommand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Indent printed JSON.
    pub pretty: bool,
    /// Directory receiving sample documents when no output file is given.
    pub output_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `OPENBACH_SCENARIO_PRETTY`: Indent JSON output (default: "false")
    /// - `OPENBACH_SCENARIO_OUTPUT_DIR`: Directory for sample documents (default: stdout)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pretty = match lookup("OPENBACH_SCENARIO_PRETTY") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                anyhow::anyhow!("invalid OPENBACH_SCENARIO_PRETTY: '{}'", value)
            })?,
            None => false,
        };

        let output_dir = lookup("OPENBACH_SCENARIO_OUTPUT_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        Ok(Self { pretty, output_dir })
    }

    /// Enable or disable indented output.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set the directory receiving sample documents.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Where a document named `name` goes: the explicit file, a file in the
    /// output directory, or `None` for stdout.
    pub fn destination(&self, explicit: Option<&Path>, name: &str) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.output_dir.as_ref().map(|dir| dir.join(format!("{}.json", name))))
    }

    /// Render a JSON value according to the `pretty` setting.
    pub fn render(&self, value: &serde_json::Value) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Reject an output directory that exists as a regular file.
pub fn check_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        bail!("output directory {:?} is not a directory", dir);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CliConfig::default());
        assert!(!config.pretty);
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_env_values() {
        let config = CliConfig::from_lookup(lookup(&[
            ("OPENBACH_SCENARIO_PRETTY", "TRUE"),
            ("OPENBACH_SCENARIO_OUTPUT_DIR", "/tmp/scenarios"),
        ]))
        .unwrap();
        assert!(config.pretty);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/scenarios")));
    }

    #[test]
    fn test_invalid_pretty_value() {
        let err = CliConfig::from_lookup(lookup(&[("OPENBACH_SCENARIO_PRETTY", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("OPENBACH_SCENARIO_PRETTY"));
    }

    #[test]
    fn test_destination() {
        let config = CliConfig::default();
        assert_eq!(config.destination(None, "if"), None);

        let config = config.with_output_dir("out");
        assert_eq!(
            config.destination(None, "if"),
            Some(PathBuf::from("out/if.json"))
        );
        assert_eq!(
            config.destination(Some(Path::new("x.json")), "if"),
            Some(PathBuf::from("x.json"))
        );
    }

    #[test]
    fn test_render() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(CliConfig::default().render(&value).unwrap(), r#"{"a":1}"#);
        assert_eq!(
            CliConfig::default().with_pretty(true).render(&value).unwrap(),
            "{\n  \"a\": 1\n}"
        );
    }
}
