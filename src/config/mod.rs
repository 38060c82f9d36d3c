//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::posts::Category;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quaderno";
const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_POSTS_DIR: &str = "content/posts";
const DEFAULT_INDEX_KEY: &str = "posts-index.json";
const DEFAULT_LOCAL_INDEX_PATH: &str = "content/posts-index.json";
const DEFAULT_CATEGORY: Category = Category::Dev;

/// Command-line arguments for the Quaderno binary.
#[derive(Debug, Parser)]
#[command(name = "quaderno", version, about = "Quaderno content maintenance")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "QUADERNO_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Rebuild the post index from a full repository scan.
    #[command(name = "rebuild")]
    Rebuild(RebuildArgs),
    /// Validate the frontmatter of every stored document.
    #[command(name = "validate")]
    Validate(ValidateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct RebuildArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CommonOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the content repository branch.
    #[arg(long = "content-branch", value_name = "BRANCH")]
    pub content_branch: Option<String>,

    /// Override the local index fallback path.
    #[arg(long = "index-local-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub index_local_path: Option<PathBuf>,

    /// Override the blob storage endpoint.
    #[arg(long = "blob-endpoint", value_name = "URL")]
    pub blob_endpoint: Option<String>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub content: ContentSettings,
    pub blob: Option<BlobSettings>,
    pub index: IndexSettings,
    pub logging: LoggingSettings,
}

/// Location and credentials of the content repository.
#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    pub posts_dir: String,
}

/// Blob storage backend for the persisted index document.
#[derive(Debug, Clone)]
pub struct BlobSettings {
    pub endpoint: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub key: String,
    pub local_path: PathBuf,
    pub default_category: Category,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse the command line and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("QUADERNO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Rebuild(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::Validate(args)) => raw.apply_overrides(&args.overrides),
        None => {}
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    content: RawContentSettings,
    blob: RawBlobSettings,
    index: RawIndexSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    api_base: Option<String>,
    owner: Option<String>,
    repo: Option<String>,
    branch: Option<String>,
    token: Option<String>,
    posts_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBlobSettings {
    endpoint: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawIndexSettings {
    key: Option<String>,
    local_path: Option<PathBuf>,
    default_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &CommonOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(branch) = overrides.content_branch.as_ref() {
            self.content.branch = Some(branch.clone());
        }
        if let Some(path) = overrides.index_local_path.as_ref() {
            self.index.local_path = Some(path.clone());
        }
        if let Some(endpoint) = overrides.blob_endpoint.as_ref() {
            self.blob.endpoint = Some(endpoint.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            content,
            blob,
            index,
            logging,
        } = raw;

        Ok(Self {
            content: build_content_settings(content)?,
            blob: build_blob_settings(blob),
            index: build_index_settings(index)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let owner = require_non_empty(content.owner, "content.owner")?;
    let repo = require_non_empty(content.repo, "content.repo")?;
    let token = require_non_empty(content.token, "content.token")?;

    Ok(ContentSettings {
        api_base: content
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        owner,
        repo,
        branch: content.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        token,
        posts_dir: content
            .posts_dir
            .unwrap_or_else(|| DEFAULT_POSTS_DIR.to_string()),
    })
}

fn build_blob_settings(blob: RawBlobSettings) -> Option<BlobSettings> {
    let endpoint = blob.endpoint.filter(|endpoint| !endpoint.trim().is_empty())?;
    Some(BlobSettings {
        endpoint,
        token: blob.token,
    })
}

fn build_index_settings(index: RawIndexSettings) -> Result<IndexSettings, LoadError> {
    let default_category = match index.default_category {
        Some(raw) => Category::parse(&raw).ok_or_else(|| {
            LoadError::invalid(
                "index.default_category",
                format!("unknown category `{raw}`"),
            )
        })?,
        None => DEFAULT_CATEGORY,
    };

    Ok(IndexSettings {
        key: index.key.unwrap_or_else(|| DEFAULT_INDEX_KEY.to_string()),
        local_path: index
            .local_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_INDEX_PATH)),
        default_category,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(raw) => LevelFilter::from_str(&raw)
            .map_err(|_| LoadError::invalid("logging.level", format!("unknown level `{raw}`")))?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn require_non_empty(value: Option<String>, key: &'static str) -> Result<String, LoadError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LoadError::invalid(key, "required value is missing")),
    }
}
