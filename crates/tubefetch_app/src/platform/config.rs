use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tubefetch_core::{DownloadOptions, ParseQualityError, Quality};
use tubefetch_engine::{EngineSettings, ThumbnailSettings, YtDlpCommand};

use super::cli::Cli;
use super::logging::{LogSettings, LogTarget};

pub const CONFIG_FILENAME: &str = "tubefetch.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error(transparent)]
    Quality(#[from] ParseQualityError),
    #[error("unknown log level '{0}'")]
    LogLevel(String),
}

/// Contents of `tubefetch.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_dir: Option<PathBuf>,
    pub quality: String,
    pub thumbnail: bool,
    pub subtitles: bool,
    pub subtitle_language: String,
    pub yt_dlp: String,
    /// Arguments placed before tubefetch's own, e.g. `["-m", "yt_dlp"]` with `yt_dlp: "python3"`.
    pub yt_dlp_args: Vec<String>,
    pub thumbnail_base_url: Option<String>,
    pub log: LogTarget,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            quality: Quality::HighestAvailable.to_string(),
            thumbnail: false,
            subtitles: false,
            subtitle_language: "en".to_string(),
            yt_dlp: YtDlpCommand::default().program,
            yt_dlp_args: Vec::new(),
            thumbnail_base_url: None,
            log: LogTarget::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `explicit`, or the first config file found; defaults when there is none.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        match candidate_paths().into_iter().find(|path| path.is_file()) {
            Some(path) => Self::read(&path),
            None => {
                engine_debug!("No {} found, using defaults", CONFIG_FILENAME);
                Ok(Self::default())
            }
        }
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        engine_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILENAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tubefetch").join(CONFIG_FILENAME));
    }
    paths
}

/// The user's Downloads folder, else the working directory.
pub fn default_output_root() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Everything the binary needs, after command-line overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    pub options: DownloadOptions,
    pub engine: EngineSettings,
    pub log: LogSettings,
}

pub fn resolve(config: AppConfig, cli: &Cli) -> Result<Settings, ConfigError> {
    let quality = match cli.quality {
        Some(quality) => quality,
        None => config.quality.parse()?,
    };
    let level = config
        .log_level
        .parse::<LevelFilter>()
        .map_err(|_| ConfigError::LogLevel(config.log_level.clone()))?;

    let options = DownloadOptions {
        quality,
        output_root: cli
            .output
            .clone()
            .or(config.output_dir)
            .unwrap_or_else(default_output_root),
        download_thumbnail: cli.thumbnail || config.thumbnail,
        download_subtitles: cli.subtitles || config.subtitles,
        subtitle_language: cli
            .sub_lang
            .clone()
            .unwrap_or(config.subtitle_language),
    };

    let ytdlp = match &cli.yt_dlp {
        Some(program) => YtDlpCommand::new(program.clone()),
        None => YtDlpCommand::new(config.yt_dlp).with_leading_args(config.yt_dlp_args),
    };
    let mut thumbnails = ThumbnailSettings::default();
    if let Some(base_url) = config.thumbnail_base_url {
        thumbnails.base_url = base_url;
    }

    Ok(Settings {
        options,
        engine: EngineSettings { ytdlp, thumbnails },
        log: LogSettings {
            target: config.log,
            level,
        }
        .with_verbosity(cli.verbose),
    })
}
