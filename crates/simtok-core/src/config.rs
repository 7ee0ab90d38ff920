//! Layered configuration.
//!
//! Values are resolved from, lowest to highest precedence: built-in
//! defaults, the project file `simtok.json` in the batch root, environment
//! variables, and CLI flags. Every resolved value remembers where it came
//! from so `--log-level debug` can show why a setting is what it is.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::external::{ExternalAdapterConfig, DEFAULT_ADAPTER_TIMEOUT};
use crate::walk::DEFAULT_MAX_DEPTH;

/// Name of the project configuration file looked up in the batch root.
pub const PROJECT_CONFIG_FILE: &str = "simtok.json";

/// Environment variable naming the adapter program.
pub const ENV_ADAPTER: &str = "SIMTOK_ADAPTER";
/// Environment variable holding the adapter timeout in seconds.
pub const ENV_ADAPTER_TIMEOUT: &str = "SIMTOK_ADAPTER_TIMEOUT";
/// Environment variable holding the walker nesting limit.
pub const ENV_MAX_DEPTH: &str = "SIMTOK_MAX_DEPTH";

/// File extension scanned for by the Java tree front end.
pub const DEFAULT_TREE_EXTENSION: &str = "json";

// ============================================================================
// Sources
// ============================================================================

/// Where a configuration value came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default.
    Default = 0,
    /// From `simtok.json`.
    ProjectConfig = 1,
    /// From an environment variable.
    EnvVar = 2,
    /// From a CLI flag.
    CliFlag = 3,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigSource::Default => "default",
            ConfigSource::ProjectConfig => "project config",
            ConfigSource::EnvVar => "environment",
            ConfigSource::CliFlag => "command line",
        };
        f.write_str(s)
    }
}

/// A value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }
}

// ============================================================================
// Front end selection
// ============================================================================

/// Which front end tokenizes the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontendKind {
    /// In-process Java rules over serialized syntax trees.
    Java,
    /// An external adapter program.
    External,
}

impl FrontendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FrontendKind::Java => "java",
            FrontendKind::External => "external",
        }
    }
}

impl fmt::Display for FrontendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrontendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "java" => Ok(FrontendKind::Java),
            "external" => Ok(FrontendKind::External),
            other => Err(format!("unknown front end '{}'", other)),
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Contents of `simtok.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub frontend: Option<FrontendKind>,
    pub adapter: Option<PathBuf>,
    pub adapter_args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub max_depth: Option<usize>,
    pub extension: Option<String>,
}

impl ProjectConfig {
    /// Load `simtok.json` from `root`, or `None` if there is none.
    pub fn load(root: &Path) -> Result<Option<ProjectConfig>, ConfigError> {
        let path = root.join(PROJECT_CONFIG_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| ConfigError::ProjectFile { path, source })
    }
}

/// Settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--frontend`
    pub frontend: Option<FrontendKind>,
    /// `--adapter`
    pub adapter: Option<PathBuf>,
    /// `--adapter-arg` (replaces configured args when non-empty)
    pub adapter_args: Vec<String>,
    /// `--timeout`
    pub timeout_secs: Option<u64>,
    /// `--max-depth`
    pub max_depth: Option<usize>,
    /// `--ext`
    pub extension: Option<String>,
}

/// Configuration failures. All of them are environment-level.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid project config {path}: {source}")]
    ProjectFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{setting} must be positive")]
    NotPositive { setting: &'static str },
}

// ============================================================================
// Resolution
// ============================================================================

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub frontend: ConfigValue<FrontendKind>,
    pub adapter: Option<ConfigValue<PathBuf>>,
    pub adapter_args: ConfigValue<Vec<String>>,
    pub timeout: ConfigValue<Duration>,
    pub max_depth: ConfigValue<usize>,
    pub extension: Option<ConfigValue<String>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            frontend: ConfigValue::new(FrontendKind::Java, ConfigSource::Default),
            adapter: None,
            adapter_args: ConfigValue::new(Vec::new(), ConfigSource::Default),
            timeout: ConfigValue::new(DEFAULT_ADAPTER_TIMEOUT, ConfigSource::Default),
            max_depth: ConfigValue::new(DEFAULT_MAX_DEPTH, ConfigSource::Default),
            extension: None,
        }
    }
}

impl ResolvedConfig {
    /// Resolve configuration for a batch rooted at `root`, reading the
    /// process environment.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Project config (`simtok.json`)
    /// 4. Defaults
    pub fn resolve(root: &Path, cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with_env(root, cli, |var| env::var(var).ok())
    }

    /// Like [`ResolvedConfig::resolve`] with an explicit environment lookup.
    pub fn resolve_with_env<E>(root: &Path, cli: &CliOverrides, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut config = ResolvedConfig::default();
        if let Some(project) = ProjectConfig::load(root)? {
            config.apply_project_config(&project)?;
        }
        config.apply_env_vars(env)?;
        config.apply_cli_overrides(cli)?;
        Ok(config)
    }

    fn apply_project_config(&mut self, project: &ProjectConfig) -> Result<(), ConfigError> {
        let source = ConfigSource::ProjectConfig;
        if let Some(frontend) = project.frontend {
            self.frontend = ConfigValue::new(frontend, source);
        }
        if let Some(ref adapter) = project.adapter {
            self.adapter = Some(ConfigValue::new(adapter.clone(), source));
        }
        if let Some(ref args) = project.adapter_args {
            self.adapter_args = ConfigValue::new(args.clone(), source);
        }
        if let Some(secs) = project.timeout_secs {
            self.timeout = ConfigValue::new(positive_secs("timeout_secs", secs)?, source);
        }
        if let Some(depth) = project.max_depth {
            self.max_depth = ConfigValue::new(positive("max_depth", depth)?, source);
        }
        if let Some(ref ext) = project.extension {
            self.extension = Some(ConfigValue::new(normalize_extension(ext), source));
        }
        Ok(())
    }

    fn apply_env_vars<E>(&mut self, env: E) -> Result<(), ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let source = ConfigSource::EnvVar;
        if let Some(adapter) = env(ENV_ADAPTER).filter(|v| !v.is_empty()) {
            self.adapter = Some(ConfigValue::new(PathBuf::from(adapter), source));
        }
        if let Some(raw) = env(ENV_ADAPTER_TIMEOUT) {
            let secs = parse_env::<u64>(ENV_ADAPTER_TIMEOUT, &raw)?;
            self.timeout = ConfigValue::new(positive_secs(ENV_ADAPTER_TIMEOUT, secs)?, source);
        }
        if let Some(raw) = env(ENV_MAX_DEPTH) {
            let depth = parse_env::<usize>(ENV_MAX_DEPTH, &raw)?;
            self.max_depth = ConfigValue::new(positive(ENV_MAX_DEPTH, depth)?, source);
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, cli: &CliOverrides) -> Result<(), ConfigError> {
        let source = ConfigSource::CliFlag;
        if let Some(frontend) = cli.frontend {
            self.frontend = ConfigValue::new(frontend, source);
        }
        if let Some(ref adapter) = cli.adapter {
            self.adapter = Some(ConfigValue::new(adapter.clone(), source));
        }
        if !cli.adapter_args.is_empty() {
            self.adapter_args = ConfigValue::new(cli.adapter_args.clone(), source);
        }
        if let Some(secs) = cli.timeout_secs {
            self.timeout = ConfigValue::new(positive_secs("--timeout", secs)?, source);
        }
        if let Some(depth) = cli.max_depth {
            self.max_depth = ConfigValue::new(positive("--max-depth", depth)?, source);
        }
        if let Some(ref ext) = cli.extension {
            self.extension = Some(ConfigValue::new(normalize_extension(ext), source));
        }
        Ok(())
    }

    /// Extension to scan for when no files are listed explicitly.
    pub fn scan_extension(&self) -> Option<&str> {
        match (&self.extension, self.frontend.value) {
            (Some(ext), _) => Some(ext.value.as_str()),
            (None, FrontendKind::Java) => Some(DEFAULT_TREE_EXTENSION),
            (None, FrontendKind::External) => None,
        }
    }

    /// Adapter settings, if an adapter program is configured.
    pub fn adapter_config(&self) -> Option<ExternalAdapterConfig> {
        self.adapter.as_ref().map(|program| {
            ExternalAdapterConfig::new(program.value.clone())
                .with_args(self.adapter_args.value.iter().cloned())
                .with_timeout(self.timeout.value)
        })
    }
}

fn parse_env<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn positive(setting: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::NotPositive { setting })
    } else {
        Ok(value)
    }
}

fn positive_secs(setting: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        Err(ConfigError::NotPositive { setting })
    } else {
        Ok(Duration::from_secs(secs))
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    fn root_with_project(json: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), json).unwrap();
        dir
    }

    mod precedence {
        use super::*;

        #[test]
        fn defaults_without_any_input() {
            let dir = TempDir::new().unwrap();
            let config =
                ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), no_env)
                    .unwrap();
            assert_eq!(config, ResolvedConfig::default());
            assert_eq!(config.scan_extension(), Some("json"));
            assert!(config.adapter_config().is_none());
        }

        #[test]
        fn project_config_overrides_defaults() {
            let dir = root_with_project(
                r#"{"frontend": "external", "adapter": "js-adapter", "max_depth": 100, "extension": ".js"}"#,
            );
            let config =
                ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), no_env)
                    .unwrap();
            assert_eq!(config.frontend.value, FrontendKind::External);
            assert_eq!(config.frontend.source, ConfigSource::ProjectConfig);
            assert_eq!(config.max_depth.value, 100);
            assert_eq!(config.scan_extension(), Some("js"));
            assert_eq!(
                config.adapter.as_ref().map(|a| a.source),
                Some(ConfigSource::ProjectConfig)
            );
        }

        #[test]
        fn env_overrides_project_config() {
            let dir = root_with_project(r#"{"adapter": "from-project", "timeout_secs": 5}"#);
            let env = env_of(&[(ENV_ADAPTER, "from-env"), (ENV_ADAPTER_TIMEOUT, "9")]);
            let config =
                ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), env)
                    .unwrap();
            let adapter = config.adapter.unwrap();
            assert_eq!(adapter.value, PathBuf::from("from-env"));
            assert_eq!(adapter.source, ConfigSource::EnvVar);
            assert_eq!(config.timeout.value, Duration::from_secs(9));
        }

        #[test]
        fn cli_overrides_everything() {
            let dir = root_with_project(r#"{"max_depth": 10, "adapter_args": ["--a"]}"#);
            let env = env_of(&[(ENV_MAX_DEPTH, "20")]);
            let cli = CliOverrides {
                max_depth: Some(30),
                adapter: Some(PathBuf::from("cli-adapter")),
                adapter_args: vec!["--b".to_string()],
                ..Default::default()
            };
            let config = ResolvedConfig::resolve_with_env(dir.path(), &cli, env).unwrap();
            assert_eq!(config.max_depth, ConfigValue::new(30, ConfigSource::CliFlag));
            assert_eq!(config.adapter_args.value, vec!["--b".to_string()]);

            let adapter = config.adapter_config().unwrap();
            assert_eq!(adapter.program, PathBuf::from("cli-adapter"));
            assert_eq!(adapter.args, vec!["--b".to_string()]);
        }

        #[test]
        fn empty_cli_args_keep_configured_args() {
            let dir = root_with_project(r#"{"adapter_args": ["--a"]}"#);
            let config =
                ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), no_env)
                    .unwrap();
            assert_eq!(config.adapter_args.value, vec!["--a".to_string()]);
        }

        #[test]
        fn external_without_extension_has_no_scan_extension() {
            let dir = TempDir::new().unwrap();
            let cli = CliOverrides {
                frontend: Some(FrontendKind::External),
                ..Default::default()
            };
            let config = ResolvedConfig::resolve_with_env(dir.path(), &cli, no_env).unwrap();
            assert_eq!(config.scan_extension(), None);
        }
    }

    mod invalid_input {
        use super::*;

        #[test]
        fn malformed_project_file_is_reported() {
            let dir = root_with_project("{ not json");
            let err =
                ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), no_env)
                    .unwrap_err();
            assert!(matches!(err, ConfigError::ProjectFile { .. }));
        }

        #[test]
        fn unknown_project_key_is_rejected() {
            let dir = root_with_project(r#"{"adaptor": "typo"}"#);
            let err =
                ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), no_env)
                    .unwrap_err();
            assert!(matches!(err, ConfigError::ProjectFile { .. }));
        }

        #[test]
        fn non_numeric_env_is_rejected() {
            let dir = TempDir::new().unwrap();
            let env = env_of(&[(ENV_MAX_DEPTH, "deep")]);
            let err = ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), env)
                .unwrap_err();
            match err {
                ConfigError::InvalidEnv { var, value, .. } => {
                    assert_eq!(var, ENV_MAX_DEPTH);
                    assert_eq!(value, "deep");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[test]
        fn zero_timeout_is_rejected() {
            let dir = TempDir::new().unwrap();
            let cli = CliOverrides {
                timeout_secs: Some(0),
                ..Default::default()
            };
            let err = ResolvedConfig::resolve_with_env(dir.path(), &cli, no_env).unwrap_err();
            assert_eq!(err.to_string(), "--timeout must be positive");
        }

        #[test]
        fn frontend_names_parse() {
            assert_eq!("java".parse::<FrontendKind>(), Ok(FrontendKind::Java));
            assert_eq!("external".parse::<FrontendKind>(), Ok(FrontendKind::External));
            assert!("python".parse::<FrontendKind>().is_err());
        }
    }
}
