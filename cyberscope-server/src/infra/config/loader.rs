use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use thiserror::Error;

use super::{
    models::{
        Config, ConfigMetadata, ConfigWarnings, DEFAULT_HOST, DEFAULT_NMAP_PATH, DEFAULT_PORT,
        DEFAULT_SCAN_TIMEOUT_SECS, DatabaseConfig, ScannerConfig, ServerConfig,
    },
    sources::{EnvConfig, FileConfig},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("cyberscope.toml"),
        PathBuf::from("config/cyberscope.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Loads `.env`, gathers the environment, reads the TOML file, and
    /// composes the result.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let env = EnvConfig::gather();
        self.load_with_env(env, env_file_loaded)
    }

    /// Composes configuration from an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        compose_config(file_config, env, config_path, env_file_loaded)
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS.iter().find(|candidate| candidate.exists()) {
                Some(found) => found.clone(),
                None => return Ok((None, None)),
            },
        };

        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();
    if config_path.is_none() {
        warnings.push_with_hint(
            "No cyberscope.toml detected; using environment variables and defaults",
            "Create cyberscope.toml or point CYBERSCOPE_CONFIG at a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        scanner: file_scanner,
        database: file_database,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };
    if server.host.trim().is_empty() {
        return Err(ConfigLoadError::InvalidValue {
            key: "server.host",
            reason: "must not be empty".into(),
        });
    }
    if !server.is_loopback() {
        warnings.push_with_hint(
            format!("Server bound to {}; the scan API is reachable beyond localhost", server.host),
            "Bind to 127.0.0.1 unless the API is protected by other means",
        );
    }

    let scanner = ScannerConfig {
        nmap_path: env
            .nmap_path
            .or(file_scanner.nmap_path)
            .unwrap_or_else(|| DEFAULT_NMAP_PATH.to_string()),
        timeout_secs: env
            .scan_timeout_secs
            .or(file_scanner.timeout_secs)
            .unwrap_or(DEFAULT_SCAN_TIMEOUT_SECS),
        skip_privilege_check: env
            .skip_privilege_check
            .or(file_scanner.skip_privilege_check)
            .unwrap_or(false),
    };
    if scanner.timeout_secs == 0 {
        return Err(ConfigLoadError::InvalidValue {
            key: "scanner.timeout_secs",
            reason: "must be greater than zero".into(),
        });
    }
    if scanner.skip_privilege_check {
        warnings.push("Privilege pre-flight disabled; scans may fail inside nmap instead");
    }

    let database = DatabaseConfig {
        url: env.database_url.or(file_database.url),
    };
    if database.url.is_some() && !cfg!(feature = "postgres") {
        warnings.push_with_hint(
            "database.url is set but this build has no Postgres support; using in-memory storage",
            "Rebuild with `--features postgres`",
        );
    }

    Ok(ConfigLoad {
        config: Config {
            server,
            scanner,
            database,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        },
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_without_sources() {
        let load = compose_config(None, EnvConfig::default(), None, false).unwrap();
        let config = load.config;
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.scanner.nmap_path, "nmap");
        assert_eq!(config.scanner.timeout_secs, 900);
        assert!(!config.scanner.skip_privilege_check);
        assert!(config.database.url.is_none());
        assert!(!load.warnings.is_empty());
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_config(
            r#"
[server]
port = 6000

[scanner]
nmap_path = "/opt/nmap/bin/nmap"
timeout_secs = 120
"#,
        );
        let env = EnvConfig {
            server_port: Some(7000),
            scan_timeout_secs: Some(30),
            ..EnvConfig::default()
        };

        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env, false)
            .unwrap();

        assert_eq!(load.config.server.port, 7000);
        assert_eq!(load.config.scanner.timeout_secs, 30);
        assert_eq!(load.config.scanner.nmap_path, "/opt/nmap/bin/nmap");
        assert_eq!(load.config.metadata.config_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn env_config_path_is_honored() {
        let file = write_config("[server]\nhost = \"localhost\"\n");
        let env = EnvConfig {
            config_path: Some(file.path().to_path_buf()),
            ..EnvConfig::default()
        };
        let load = ConfigLoader::new().load_with_env(env, false).unwrap();
        assert_eq!(load.config.server.host, "localhost");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_config_path("/nonexistent/cyberscope.toml")
            .load_with_env(EnvConfig::default(), false)
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let file = write_config("[server\nport = ");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default(), false)
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let env = EnvConfig {
            scan_timeout_secs: Some(0),
            ..EnvConfig::default()
        };
        let err = compose_config(None, env, None, false).unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidValue { key: "scanner.timeout_secs", .. }));
    }

    #[test]
    fn public_bind_is_warned_about() {
        let env = EnvConfig {
            server_host: Some("0.0.0.0".into()),
            ..EnvConfig::default()
        };
        let load = compose_config(None, env, Some(PathBuf::from("x.toml")), false).unwrap();
        assert!(load.warnings.iter().any(|w| w.message.contains("beyond localhost")));
    }
}
