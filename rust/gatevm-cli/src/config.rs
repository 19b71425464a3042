//! Configuration file parsing for `gatevm.toml`.
//!
//! Searches current directory then ancestors, falling back to
//! `~/.config/gatevm/gatevm.toml` if no project-level file is found.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "gatevm.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid toml in '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct GatevmConfig {
    #[serde(default)]
    pub vm: VmSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct VmSection {
    /// Instruction budget; absent means unlimited.
    pub max_steps: Option<u64>,
    /// Print every executed instruction to stderr.
    #[serde(default)]
    pub trace: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputSection {
    #[serde(default = "default_color")]
    pub color: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            color: default_color(),
        }
    }
}

fn default_color() -> bool {
    true
}

impl GatevmConfig {
    /// Load config from `gatevm.toml`, searching current dir then parents.
    /// Returns `Default` when no file is found or it fails to parse.
    pub fn load() -> Self {
        match Self::find() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Locate the config file that [`GatevmConfig::load`] would read.
    pub fn find() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                break;
            }
        }
        let global = home_dir()?.join(".config").join("gatevm").join(CONFIG_FILE);
        global.exists().then_some(global)
    }

    /// Parse a TOML string directly.
    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Template written by `gatevm init`.
    pub fn default_template() -> &'static str {
        r#"# gatevm configuration

[vm]
# Stop with "Step limit exceeded" after this many instructions.
# max_steps = 1000000
trace = false

[output]
color = true
"#
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = GatevmConfig::parse("").expect("should parse");
        assert_eq!(cfg, GatevmConfig::default());
        assert_eq!(cfg.vm.max_steps, None);
        assert!(!cfg.vm.trace);
        assert!(cfg.output.color);
    }

    #[test]
    fn parse_vm_section() {
        let cfg = GatevmConfig::parse(
            r#"
[vm]
max_steps = 42
trace = true
"#,
        )
        .expect("should parse");
        assert_eq!(cfg.vm.max_steps, Some(42));
        assert!(cfg.vm.trace);
        assert!(cfg.output.color);
    }

    #[test]
    fn parse_output_section() {
        let cfg = GatevmConfig::parse("[output]\ncolor = false\n").expect("should parse");
        assert!(!cfg.output.color);
    }

    #[test]
    fn template_parses_to_defaults() {
        let cfg = GatevmConfig::parse(GatevmConfig::default_template()).expect("template parses");
        assert_eq!(cfg, GatevmConfig::default());
    }

    #[test]
    fn wrong_type_is_an_error() {
        assert!(GatevmConfig::parse("[vm]\nmax_steps = \"lots\"\n").is_err());
    }

    #[test]
    fn load_from_missing_file_reports_path() {
        let err = GatevmConfig::load_from(Path::new("/nonexistent/gatevm.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/gatevm.toml"));
    }
}
