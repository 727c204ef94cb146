//! Configuration — YAML config + env var overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one sub-directory per entry
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    /// Only recordings staged under this directory are accepted by the host
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Base address of the analysis collaborator
    #[serde(default = "default_backend_host")]
    pub backend_host: String,

    /// Upper bound on one analysis call, in seconds (0 = wait forever)
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_seconds: u64,

    /// Total attempts per analysis call (1 = no retry)
    #[serde(default = "default_analysis_max_attempts")]
    pub analysis_max_attempts: u32,

    /// Pause between analysis attempts
    #[serde(default = "default_analysis_retry_backoff")]
    pub analysis_retry_backoff_ms: u64,

    /// Default title is "<title_prefix> <date>"
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,

    /// Resolved project root (set at load time, not serialized from YAML)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_storage_root() -> String {
    "echo_entries".into()
}
fn default_upload_dir() -> String {
    "echo_uploads".into()
}
fn default_backend_host() -> String {
    "http://127.0.0.1:5000".into()
}
fn default_analysis_timeout() -> u64 {
    120
}
fn default_analysis_max_attempts() -> u32 {
    1
}
fn default_analysis_retry_backoff() -> u64 {
    2000
}
fn default_title_prefix() -> String {
    "Entry on".into()
}

impl Config {
    /// Load config from a YAML file with env var overrides.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        let mut config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;

        // Resolve project root from config file location
        let parent = config_path.parent().unwrap_or(Path::new("."));
        config.project_root = parent
            .canonicalize()
            .unwrap_or_else(|_| parent.to_path_buf());

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields defaults (still env-overridden).
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.is_file() {
            return Self::load(config_path);
        }
        let mut config = Config::default();
        config.project_root = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(root) = std::env::var("ECHO_STORAGE_ROOT") {
            self.storage_root = root;
        }
        if let Ok(dir) = std::env::var("ECHO_UPLOAD_DIR") {
            self.upload_dir = dir;
        }
        if let Ok(host) = std::env::var("ECHO_BACKEND_HOST") {
            self.backend_host = host;
        }
        if let Ok(secs) = std::env::var("ECHO_ANALYSIS_TIMEOUT") {
            self.analysis_timeout_seconds = secs
                .trim()
                .parse()
                .with_context(|| format!("ECHO_ANALYSIS_TIMEOUT is not a number: {}", secs))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.backend_host.starts_with("http://") && !self.backend_host.starts_with("https://") {
            anyhow::bail!(
                "backend_host must start with http:// or https:// (got '{}')",
                self.backend_host
            );
        }
        if self.analysis_max_attempts == 0 {
            anyhow::bail!("analysis_max_attempts must be at least 1");
        }
        Ok(())
    }

    /// Storage root as an absolute-or-project-relative path.
    pub fn resolve_storage_root(&self) -> PathBuf {
        self.resolve(&self.storage_root)
    }

    pub fn resolve_upload_dir(&self) -> PathBuf {
        self.resolve(&self.upload_dir)
    }

    fn resolve(&self, dir: &str) -> PathBuf {
        let p = Path::new(dir);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        }
    }

    pub fn analysis_timeout(&self) -> Option<Duration> {
        match self.analysis_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            upload_dir: default_upload_dir(),
            backend_host: default_backend_host(),
            analysis_timeout_seconds: default_analysis_timeout(),
            analysis_max_attempts: default_analysis_max_attempts(),
            analysis_retry_backoff_ms: default_analysis_retry_backoff(),
            title_prefix: default_title_prefix(),
            project_root: PathBuf::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "title_prefix: Entry on").unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.storage_root, "echo_entries");
        assert_eq!(config.analysis_max_attempts, 1);
        assert_eq!(config.analysis_retry_backoff_ms, 2000);
        assert!(config.resolve_storage_root().ends_with("echo_entries"));
        assert!(config.resolve_upload_dir().ends_with("echo_uploads"));
    }

    #[test]
    fn test_load_config_custom_values() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "storage_root: /var/lib/echo\nupload_dir: /tmp/echo-staging\nbackend_host: https://analysis.example.com\nanalysis_max_attempts: 3\ntitle_prefix: Journal"
        )
        .unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.resolve_storage_root(), PathBuf::from("/var/lib/echo"));
        assert_eq!(config.resolve_upload_dir(), PathBuf::from("/tmp/echo-staging"));
        assert_eq!(config.backend_host, "https://analysis.example.com");
        assert_eq!(config.analysis_max_attempts, 3);
        assert_eq!(config.title_prefix, "Journal");
    }

    #[test]
    fn test_bad_backend_host_fails() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "backend_host: ftp://nowhere").unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn test_zero_attempts_fails() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "analysis_max_attempts: 0").unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let config = Config {
            analysis_timeout_seconds: 0,
            ..Config::default()
        };
        assert_eq!(config.analysis_timeout(), None);
        assert_eq!(
            Config::default().analysis_timeout(),
            Some(Duration::from_secs(120))
        );
    }
}
