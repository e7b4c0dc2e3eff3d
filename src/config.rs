//! Configuration for franx.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FRANX_EXTRACTOR_URL, FRANX_CLASSIFIER_URL)
//! 2. Config file (.franx/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .franx/config.yaml
//! - Falls back to the user config directory (e.g. ~/.config/franx/config.yaml)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::{MainRole, RoleColors, RoleFilter, DEFAULT_ROLE_COLOR};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const ENV_EXTRACTOR_URL: &str = "FRANX_EXTRACTOR_URL";
pub const ENV_CLASSIFIER_URL: &str = "FRANX_CLASSIFIER_URL";

/// Colour table key for roles missing from the table
const DEFAULT_COLOR_KEY: &str = "default";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub display: Option<DisplayConfig>,
    /// Role name (or "default") to CSS colour
    #[serde(default)]
    pub colors: HashMap<String, String>,
    #[serde(default)]
    pub prediction: Option<PredictionConfig>,
    #[serde(default)]
    pub models: Option<ModelsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayConfig {
    pub threshold: Option<f64>,
    pub hide_repeat: Option<bool>,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionConfig {
    pub score_threshold: Option<f64>,
    pub margin: Option<f64>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsConfig {
    pub extractor_url: Option<String>,
    pub classifier_url: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub display: DisplaySettings,
    pub colors: RoleColors,
    pub prediction: PredictionSettings,
    pub models: ModelEndpoints,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    /// Default sentence threshold
    pub threshold: f64,
    pub hide_repeat: bool,
    pub roles: RoleFilter,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            hide_repeat: false,
            roles: RoleFilter::all(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionSettings {
    /// Stage-2 scores must be strictly greater than this to be kept
    pub score_threshold: f64,
    /// Fine roles within this delta of the top score are selected
    pub margin: f64,
    pub timeout_seconds: u64,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.01,
            margin: 0.05,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEndpoints {
    pub extractor_url: String,
    pub classifier_url: String,
}

impl Default for ModelEndpoints {
    fn default() -> Self {
        Self {
            extractor_url: "http://localhost:8000/extract".to_string(),
            classifier_url: "http://localhost:8000/classify".to_string(),
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            display: DisplaySettings::default(),
            colors: RoleColors::default(),
            prediction: PredictionSettings::default(),
            models: ModelEndpoints::default(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".franx").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("franx").join("config.yaml"))
        .filter(|path| path.exists())
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Build the colour table from config entries
///
/// Roles missing from the file keep their built-in colour.
fn resolve_colors(entries: &HashMap<String, String>) -> Result<RoleColors> {
    let fallback = entries
        .get(DEFAULT_COLOR_KEY)
        .map(String::as_str)
        .unwrap_or(DEFAULT_ROLE_COLOR);

    let defaults = RoleColors::default();
    let mut colors = RoleColors::empty(fallback);
    for role in MainRole::ALL {
        colors = colors.with_color(role, defaults.color_for(role));
    }

    for (key, color) in entries {
        if key.eq_ignore_ascii_case(DEFAULT_COLOR_KEY) {
            continue;
        }
        let role: MainRole = key
            .parse()
            .with_context(|| format!("Invalid key in colors section: '{}'", key))?;
        colors = colors.with_color(role, color.clone());
    }
    Ok(colors)
}

/// Merge the config file and environment over the defaults
fn resolve(
    file: Option<ConfigFile>,
    config_file: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let mut resolved = ResolvedConfig {
        config_file,
        ..ResolvedConfig::default()
    };

    if let Some(file) = file {
        let display = file.display.unwrap_or_default();
        if let Some(threshold) = display.threshold {
            if !threshold.is_finite() {
                anyhow::bail!("display.threshold must be a finite number");
            }
            resolved.display.threshold = threshold;
        }
        if let Some(hide_repeat) = display.hide_repeat {
            resolved.display.hide_repeat = hide_repeat;
        }
        if let Some(roles) = display.roles {
            resolved.display.roles = roles
                .iter()
                .map(|r| r.parse::<MainRole>())
                .collect::<Result<Vec<_>, _>>()
                .map(RoleFilter::from_roles)
                .context("Invalid role in display.roles")?;
        }

        resolved.colors = resolve_colors(&file.colors)?;

        let prediction = file.prediction.unwrap_or_default();
        let defaults = PredictionSettings::default();
        resolved.prediction = PredictionSettings {
            score_threshold: prediction.score_threshold.unwrap_or(defaults.score_threshold),
            margin: prediction.margin.unwrap_or(defaults.margin),
            timeout_seconds: prediction.timeout_seconds.unwrap_or(defaults.timeout_seconds),
        };
        if resolved.prediction.margin.is_nan() || resolved.prediction.margin < 0.0 {
            anyhow::bail!("prediction.margin must be a non-negative number");
        }
        if !resolved.prediction.score_threshold.is_finite() {
            anyhow::bail!("prediction.score_threshold must be a finite number");
        }
        if resolved.prediction.timeout_seconds == 0 {
            anyhow::bail!("prediction.timeout_seconds must be positive");
        }

        let models = file.models.unwrap_or_default();
        if let Some(url) = models.extractor_url {
            resolved.models.extractor_url = url;
        }
        if let Some(url) = models.classifier_url {
            resolved.models.classifier_url = url;
        }
    }

    if let Some(url) = env(ENV_EXTRACTOR_URL) {
        resolved.models.extractor_url = url;
    }
    if let Some(url) = env(ENV_CLASSIFIER_URL) {
        resolved.models.classifier_url = url;
    }

    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };
    resolve(file, config_file, |key| std::env::var(key).ok())
}

/// Load configuration from an explicit file, still honouring env overrides
pub fn load_config_from(path: &Path) -> Result<ResolvedConfig> {
    let file = load_config_file(path)?;
    resolve(Some(file), Some(path.to_path_buf()), |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(body: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let franx_dir = temp.path().join(".franx");
        std::fs::create_dir_all(&franx_dir).unwrap();

        let config_path = franx_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", body).unwrap();
        (temp, config_path)
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, None, no_env).unwrap();

        assert!(config.config_file.is_none());
        assert_eq!(config.display.threshold, 0.0);
        assert!(!config.display.hide_repeat);
        assert_eq!(config.display.roles, RoleFilter::all());
        assert_eq!(config.prediction, PredictionSettings::default());
        assert_eq!(config.colors.color_for(MainRole::Protagonist), "#a1f4a1");
        assert_eq!(config.colors.fallback(), DEFAULT_ROLE_COLOR);
    }

    #[test]
    fn test_config_file_parsing() {
        let (_temp, config_path) = write_config(
            r##"
version: "1.0"
display:
  threshold: 0.5
  hide_repeat: true
  roles: [protagonist, Antagonist]
colors:
  Antagonist: "#ff0000"
  default: "#eeeeee"
prediction:
  margin: 0.1
models:
  extractor_url: http://models:9000/extract
"##,
        );

        let file = load_config_file(&config_path).unwrap();
        assert_eq!(file.version, "1.0");

        let config = resolve(Some(file), Some(config_path.clone()), no_env).unwrap();
        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(config.display.threshold, 0.5);
        assert!(config.display.hide_repeat);
        assert!(config.display.roles.contains(MainRole::Protagonist));
        assert!(!config.display.roles.contains(MainRole::Innocent));
        assert_eq!(config.colors.color_for(MainRole::Antagonist), "#ff0000");
        assert_eq!(config.colors.color_for(MainRole::Innocent), "#a1c9f4");
        assert_eq!(config.colors.fallback(), "#eeeeee");
        assert_eq!(config.prediction.margin, 0.1);
        assert_eq!(config.prediction.score_threshold, 0.01);
        assert_eq!(config.models.extractor_url, "http://models:9000/extract");
        assert_eq!(config.models.classifier_url, ModelEndpoints::default().classifier_url);
    }

    #[test]
    fn test_env_overrides_file() {
        let (_temp, config_path) = write_config(
            r#"
version: "1.0"
models:
  extractor_url: http://file/extract
  classifier_url: http://file/classify
"#,
        );
        let file = load_config_file(&config_path).unwrap();
        let env = |key: &str| (key == ENV_CLASSIFIER_URL).then(|| "http://env/classify".to_string());

        let config = resolve(Some(file), None, env).unwrap();
        assert_eq!(config.models.extractor_url, "http://file/extract");
        assert_eq!(config.models.classifier_url, "http://env/classify");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let (_temp, config_path) = write_config("version: \"1.0\"\ncolors:\n  Villain: red\n");
        let file = load_config_file(&config_path).unwrap();
        assert!(resolve(Some(file), None, no_env).is_err());

        let (_temp, config_path) = write_config("version: \"1.0\"\nprediction:\n  margin: -0.5\n");
        let file = load_config_file(&config_path).unwrap();
        assert!(resolve(Some(file), None, no_env).is_err());

        let (_temp, config_path) = write_config("version: \"1.0\"\ndisplay:\n  roles: [hero]\n");
        let file = load_config_file(&config_path).unwrap();
        assert!(resolve(Some(file), None, no_env).is_err());
    }

    #[test]
    fn test_missing_version_fails_to_parse() {
        let (_temp, config_path) = write_config("display:\n  threshold: 0.2\n");
        assert!(load_config_file(&config_path).is_err());
    }

    #[test]
    fn test_load_config_from_explicit_path() {
        let (_temp, config_path) = write_config("version: \"1.0\"\ndisplay:\n  threshold: 0.3\n");
        let config = load_config_from(&config_path).unwrap();
        assert_eq!(config.display.threshold, 0.3);
    }
}
