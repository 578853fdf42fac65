//! Configuration loading utilities

use crate::Config;
use chrono::NaiveDate;
use covchart_common::{CovChartError, ImageFormat, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_VAR: &str = "COVCHART_CONFIG_PATH";

/// File names probed in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILES: [&str; 3] = ["covchart.yaml", "covchart.yml", "covchart.toml"];

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the environment-named file, a default file in
    /// the working directory, or built-in defaults; then apply environment
    /// overrides and validate. Also returns the file read, if any.
    pub fn load() -> Result<(Config, Option<PathBuf>)> {
        let path = Self::locate_from(|var| env::var(var).ok());
        let config = Self::load_located(path.as_deref())?;
        Ok((config, path))
    }

    /// Load configuration from a specific file, with environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        Self::load_located(Some(path.as_ref()))
    }

    fn load_located(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::parse_file(path)?,
            None => Config::default(),
        };
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Finds the configuration file to read: the path named by
    /// [`CONFIG_PATH_VAR`], else the first default file that exists
    pub fn locate_from<F>(lookup: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(CONFIG_PATH_VAR) {
            return Some(PathBuf::from(path));
        }
        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
    }

    /// Read and parse a file, choosing TOML or YAML by extension
    pub fn parse_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CovChartError::config_with_source(format!("Failed to read {}", path.display()), e)
        })?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::parse_toml(&content)
        } else {
            Self::parse_yaml(&content)
        }
    }

    /// Parse a YAML document
    pub fn parse_yaml(content: &str) -> Result<Config> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a TOML document
    pub fn parse_toml(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
        Self::apply_overrides_from(config, |var| env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("COVCHART_OUTPUT_DIR") {
            debug!("Output directory overridden by environment");
            config.output.dir = PathBuf::from(dir);
        }

        if let Some(format) = lookup("COVCHART_IMAGE_FORMAT") {
            config.output.format = parse_var::<ImageFormat>("COVCHART_IMAGE_FORMAT", &format)?;
        }

        if let Some(start) = lookup("COVCHART_START_DATE") {
            config.pipeline.start_date = Some(parse_var::<NaiveDate>("COVCHART_START_DATE", &start)?);
        }

        if let Some(url) = lookup("COVCHART_GOV_API_URL") {
            config.sources.gov_api_url = url;
        }

        if let Some(url) = lookup("COVCHART_ZOE_URL") {
            config.sources.zoe_url = url;
        }

        if let Some(timeout) = lookup("COVCHART_HTTP_TIMEOUT") {
            config.sources.timeout_seconds = parse_var("COVCHART_HTTP_TIMEOUT", &timeout)?;
        }

        if let Some(level) = lookup("COVCHART_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }
}

/// Parses an environment value, naming the variable on failure
fn parse_var<T>(var: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse::<T>().map_err(|e| {
        CovChartError::config_with_source(format!("Failed to parse environment variable '{var}'"), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_apply() {
        let mut config = Config::default();
        let lookup = lookup_from(&[
            ("COVCHART_OUTPUT_DIR", "/tmp/out"),
            ("COVCHART_IMAGE_FORMAT", "svg"),
            ("COVCHART_START_DATE", "2020-09-01"),
            ("COVCHART_HTTP_TIMEOUT", "5"),
            ("COVCHART_LOG_LEVEL", "debug"),
        ]);

        ConfigLoader::apply_overrides_from(&mut config, lookup).unwrap();

        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.output.format, ImageFormat::Svg);
        assert_eq!(config.pipeline.start_date, NaiveDate::from_ymd_opt(2020, 9, 1));
        assert_eq!(config.sources.timeout_seconds, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_env_value_names_variable() {
        let mut config = Config::default();
        let lookup = lookup_from(&[("COVCHART_HTTP_TIMEOUT", "soon")]);

        let error = ConfigLoader::apply_overrides_from(&mut config, lookup).unwrap_err();
        assert!(error.to_string().contains("COVCHART_HTTP_TIMEOUT"));
    }

    #[test]
    fn test_locate_prefers_named_file() {
        let lookup = lookup_from(&[(CONFIG_PATH_VAR, "/etc/covchart/prod.yaml")]);
        assert_eq!(
            ConfigLoader::locate_from(lookup),
            Some(PathBuf::from("/etc/covchart/prod.yaml"))
        );
    }

    #[test]
    fn test_locate_without_files_uses_defaults() {
        // the crate directory holds no covchart.* files
        assert_eq!(ConfigLoader::locate_from(|_| None), None);
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let mut config = Config::default();
        ConfigLoader::apply_overrides_from(&mut config, |_| None).unwrap();
        assert_eq!(config, Config::default());
    }
}
