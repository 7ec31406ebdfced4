use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;

/// Environment variable naming an optional JSON settings file.
pub const CONFIG_ENV: &str = "SERVER_CONFIG";

/// Whether the process answers one client or keeps accepting.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServeMode {
    #[default]
    Once,
    Forever,
}

/// Optional knobs read from the settings file. The port is never here.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub host: String,
    pub root: Option<PathBuf>,
    pub mode: ServeMode,
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "0.0.0.0".to_string(),
            root: None,
            mode: ServeMode::Once,
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub root: PathBuf,
    pub mode: ServeMode,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Usage { program: String },
    InvalidPort { program: String, value: String },
    ReadConfigFileFail(PathBuf, std::io::Error),
    ConfigFormatError(PathBuf, serde_json::Error),
    WorkingDirUnavailable(std::io::Error),
}

impl ConfigError {
    /// Usage problems are reported bare, before any logging exists.
    pub fn is_usage(&self) -> bool {
        matches!(self, ConfigError::Usage { .. } | ConfigError::InvalidPort { .. })
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Usage { program } => write!(f, "Usage: {} <port number>", program),
            ConfigError::InvalidPort { program, value } => write!(
                f,
                "Invalid port number {:?}\nUsage: {} <port number>",
                value, program
            ),
            ConfigError::ReadConfigFileFail(path, e) => {
                write!(f, "Reading config {} fail: {}", path.display(), e)
            }
            ConfigError::ConfigFormatError(path, e) => {
                write!(f, "Config {} is malformed: {}", path.display(), e)
            }
            ConfigError::WorkingDirUnavailable(e) => {
                write!(f, "Cannot determine working directory: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Reads the port from `args`, which include the program name first.
pub fn parse_port(args: &[String]) -> Result<u16, ConfigError> {
    let program = args
        .first()
        .cloned()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    match args {
        [_, port] => port.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort {
            program,
            value: port.clone(),
        }),
        _ => Err(ConfigError::Usage { program }),
    }
}

pub async fn read_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::ReadConfigFileFail(path.to_path_buf(), e))?;
    serde_json::from_str(&content).map_err(|e| ConfigError::ConfigFormatError(path.to_path_buf(), e))
}

/// Builds the runtime config from the command line and `SERVER_CONFIG`.
pub async fn load(args: &[String]) -> Result<Config, ConfigError> {
    let port = parse_port(args)?;
    let settings_path = env::var_os(CONFIG_ENV).map(PathBuf::from);
    let settings = read_settings(settings_path.as_deref()).await?;
    Config::from_settings(port, settings)
}

impl Config {
    pub fn from_settings(port: u16, settings: Settings) -> Result<Self, ConfigError> {
        let root = match settings.root {
            Some(root) => root,
            None => env::current_dir().map_err(ConfigError::WorkingDirUnavailable)?,
        };
        Ok(Config {
            host: settings.host,
            port,
            root,
            mode: settings.mode,
            log_dir: settings.log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_port_argument() {
        assert_eq!(parse_port(&args(&["server", "8080"])).unwrap(), 8080);
        assert_eq!(parse_port(&args(&["server", "0"])).unwrap(), 0);
    }

    #[test]
    fn wrong_argument_count_is_usage_error() {
        for list in [&["server"][..], &["server", "80", "81"][..], &[][..]] {
            let err = parse_port(&args(list)).unwrap_err();
            assert!(matches!(err, ConfigError::Usage { .. }));
            assert!(err.is_usage());
        }
        let err = parse_port(&args(&["./server"])).unwrap_err();
        assert_eq!(err.to_string(), "Usage: ./server <port number>");
    }

    #[test]
    fn unparsable_port_is_usage_error() {
        for bad in ["http", "65536", "-1", ""] {
            let err = parse_port(&args(&["server", bad])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPort { .. }), "{bad}");
            assert!(err.is_usage());
        }
    }

    #[tokio::test]
    async fn missing_settings_file_means_defaults() {
        assert_eq!(read_settings(None).await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        std::fs::write(
            &path,
            r#"{ "host": "127.0.0.1", "root": "/srv/www", "mode": "forever" }"#,
        )
        .unwrap();

        let settings = read_settings(Some(&path)).await.unwrap();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.root, Some(PathBuf::from("/srv/www")));
        assert_eq!(settings.mode, ServeMode::Forever);
        assert_eq!(settings.log_dir, None);

        let config = Config::from_settings(9000, settings).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.root, PathBuf::from("/srv/www"));
    }

    #[tokio::test]
    async fn settings_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            read_settings(Some(&missing)).await,
            Err(ConfigError::ReadConfigFileFail(..))
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{ "port": 80 }"#).unwrap();
        assert!(matches!(
            read_settings(Some(&bad)).await,
            Err(ConfigError::ConfigFormatError(..))
        ));
    }

    #[test]
    fn root_defaults_to_working_directory() {
        let config = Config::from_settings(80, Settings::default()).unwrap();
        assert_eq!(config.root, env::current_dir().unwrap());
        assert_eq!(config.mode, ServeMode::Once);
        assert_eq!(config.host, "0.0.0.0");
    }
}
