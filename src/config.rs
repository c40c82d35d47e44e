use clap::Parser;
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variables the application understands.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_MODEL: &str = "GEMINI_MODEL";
pub const ENV_DB_NAME: &str = "DB_NAME";

const KNOWN_ENV_VARS: [&str; 3] = [ENV_API_KEY, ENV_MODEL, ENV_DB_NAME];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY not found in environment variables, .env file or configuration")]
    MissingApiKey,
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// DuckDB database file, or `:memory:`
    pub connection_string: String,
    pub pool_size: u32,
    /// Open the database with `AccessMode::ReadOnly`
    pub read_only: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // only "gemini" for now
    pub api_key: Option<String>,
    pub api_url: String,
    /// Explicit model; skips catalog-based selection when set
    pub model: Option<String>,
    pub default_model: String,
    pub preferred_models: Vec<String>,
    /// SQL dialect named in the prompt; matches the engine queries run on
    pub dialect: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub catalog_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// File with KEY=VALUE environment overrides
    #[arg(long, value_name = "FILE", default_value = ".env")]
    pub env_file: PathBuf,

    /// DuckDB database file to query
    #[arg(short, long, value_name = "PATH")]
    pub database: Option<String>,

    /// Use this model instead of picking one from the provider catalog
    #[arg(short, long)]
    pub model: Option<String>,

    /// Open the database read-only
    #[arg(long)]
    pub read_only: bool,

    /// Answer a single question and exit
    #[arg(short, long)]
    pub question: Option<String>,

    /// Execute generated queries without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Environment values, with the process environment taking precedence over
/// the `.env` file.
#[derive(Debug, Default)]
pub struct EnvVars {
    process: HashMap<String, String>,
    file: HashMap<String, String>,
}

impl EnvVars {
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        let process = KNOWN_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
            .collect();

        Ok(Self {
            process,
            file: Self::read_file(env_file)?,
        })
    }

    #[cfg(test)]
    pub fn from_maps(process: HashMap<String, String>, file: HashMap<String, String>) -> Self {
        Self { process, file }
    }

    /// Reads a dotenv style file. A missing file yields no values.
    pub fn read_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
        let values = Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini).required(false))
            .build()?
            .try_deserialize::<HashMap<String, String>>()?;
        Ok(values)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let from_file = || {
            self.file
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        };

        self.process
            .get(name)
            .cloned()
            .or_else(from_file)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Start with default configuration
        let mut config_builder =
            Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = [
                "config.toml",
                "config/config.toml",
                "/etc/nl-sql/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, FileFormat::Toml));
                    break;
                }
            }
        }

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        config.apply_env(&EnvVars::load(&args.env_file)?);
        config.apply_args(args);

        Ok(config)
    }

    pub fn apply_env(&mut self, env: &EnvVars) {
        if let Some(key) = env.get(ENV_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = env.get(ENV_MODEL) {
            self.llm.model = Some(model);
        }
        if let Some(db) = env.get(ENV_DB_NAME) {
            self.database.connection_string = db;
        }
    }

    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(database) = &args.database {
            self.database.connection_string = database.clone();
        }
        if let Some(model) = &args.model {
            self.llm.model = Some(model.clone());
        }
        if args.read_only {
            self.database.read_only = true;
        }
    }

    /// Checks the fields that must be present before anything is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(ConfigError::MissingApiKey);
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::Invalid("database.pool_size must be at least 1".to_string()));
        }
        if self.llm.max_output_tokens == 0 {
            return Err(ConfigError::Invalid("llm.max_output_tokens must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                connection_string: "nl-sql.duckdb".to_string(),
                pool_size: 2,
                read_only: false,
            },
            llm: LlmConfig {
                backend: "gemini".to_string(),
                api_key: None,
                api_url: "https://generativelanguage.googleapis.com/v1".to_string(),
                model: None,
                default_model: "gemini-1.5-flash".to_string(),
                preferred_models: vec![
                    "gemini-1.5-flash".to_string(),
                    "gemini-1.5-pro".to_string(),
                    "gemini-1.5-flash-latest".to_string(),
                    "gemini-pro".to_string(),
                    "gemini-1.0-pro".to_string(),
                ],
                dialect: "DuckDB".to_string(),
                temperature: 0.0,
                max_output_tokens: 500,
                catalog_timeout_secs: 10,
                request_timeout_secs: 30,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(process: &[(&str, &str)], file: &[(&str, &str)]) -> EnvVars {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };
        EnvVars::from_maps(to_map(process), to_map(file))
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut config = AppConfig::default();
        config.apply_env(&env(&[(ENV_API_KEY, "   ")], &[]));
        assert!(config.llm.api_key.is_none());
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn process_env_wins_over_env_file() {
        let mut config = AppConfig::default();
        config.apply_env(&env(
            &[(ENV_API_KEY, "from-process")],
            &[("gemini_api_key", "from-file"), ("db_name", "shop.duckdb")],
        ));

        assert_eq!(config.llm.api_key.as_deref(), Some("from-process"));
        assert_eq!(config.database.connection_string, "shop.duckdb");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cli_args_override_env() {
        let mut config = AppConfig::default();
        config.apply_env(&env(&[(ENV_DB_NAME, "env.duckdb"), (ENV_MODEL, "gemini-pro")], &[]));
        config.apply_args(&CliArgs {
            database: Some("cli.duckdb".to_string()),
            model: Some("gemini-1.5-pro".to_string()),
            read_only: true,
            ..Default::default()
        });

        assert_eq!(config.database.connection_string, "cli.duckdb");
        assert_eq!(config.llm.model.as_deref(), Some("gemini-1.5-pro"));
        assert!(config.database.read_only);
    }

    #[test]
    fn reads_dotenv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GEMINI_API_KEY=\"secret\"").unwrap();
        writeln!(file, "DB_NAME=company.duckdb").unwrap();

        let values = EnvVars::read_file(file.path()).unwrap();
        let env = EnvVars::from_maps(HashMap::new(), values);

        assert_eq!(env.get(ENV_API_KEY).as_deref(), Some("secret"));
        assert_eq!(env.get(ENV_DB_NAME).as_deref(), Some("company.duckdb"));
        assert_eq!(env.get(ENV_MODEL), None);
    }

    #[test]
    fn missing_dotenv_file_is_empty() {
        let values = EnvVars::read_file(Path::new("definitely/not/here/.env")).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn defaults_match_provider_conventions() {
        let config = AppConfig::default();
        assert_eq!(config.llm.default_model, "gemini-1.5-flash");
        assert_eq!(config.llm.preferred_models[0], "gemini-1.5-flash");
        assert_eq!(config.llm.max_output_tokens, 500);
        assert_eq!(config.llm.catalog_timeout_secs, 10);
        assert_eq!(config.llm.request_timeout_secs, 30);
    }
}
