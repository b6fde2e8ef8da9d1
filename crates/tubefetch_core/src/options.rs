use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Requested output quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    HighestAvailable,
    /// Exact vertical resolution, falling back to the highest available.
    ExactResolution(u32),
    AudioOnly,
}

/// Qualities offered to users, in display order.
pub const QUALITY_PRESETS: &[Quality] = &[
    Quality::HighestAvailable,
    Quality::ExactResolution(720),
    Quality::ExactResolution(480),
    Quality::ExactResolution(360),
    Quality::ExactResolution(240),
    Quality::ExactResolution(144),
    Quality::AudioOnly,
];

/// What the fetch capability should actually ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatChoice {
    Best,
    Height(u32),
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPlan {
    pub choice: FormatChoice,
    /// Requested resolution that was unavailable, when a fallback happened.
    pub fallback_from: Option<u32>,
}

impl Quality {
    /// Map the requested quality onto the heights a video actually offers.
    pub fn plan(&self, available_heights: &[u32]) -> QualityPlan {
        match *self {
            Quality::HighestAvailable => QualityPlan {
                choice: FormatChoice::Best,
                fallback_from: None,
            },
            Quality::AudioOnly => QualityPlan {
                choice: FormatChoice::Audio,
                fallback_from: None,
            },
            Quality::ExactResolution(height) if available_heights.contains(&height) => {
                QualityPlan {
                    choice: FormatChoice::Height(height),
                    fallback_from: None,
                }
            }
            Quality::ExactResolution(height) => QualityPlan {
                choice: FormatChoice::Best,
                fallback_from: Some(height),
            },
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, Quality::AudioOnly)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::HighestAvailable => write!(f, "highest"),
            Quality::ExactResolution(height) => write!(f, "{height}p"),
            Quality::AudioOnly => write!(f, "audio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown quality '{0}' (expected highest, audio or a resolution such as 720p)")]
pub struct ParseQualityError(String);

impl FromStr for Quality {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "highest" | "best" | "max" => Ok(Quality::HighestAvailable),
            "audio" | "mp3" | "audio-only" => Ok(Quality::AudioOnly),
            other => other
                .strip_suffix('p')
                .unwrap_or(other)
                .parse::<u32>()
                .ok()
                .filter(|height| *height > 0)
                .map(Quality::ExactResolution)
                .ok_or_else(|| ParseQualityError(s.to_string())),
        }
    }
}

/// User-facing options for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub quality: Quality,
    pub output_root: PathBuf,
    pub download_thumbnail: bool,
    pub download_subtitles: bool,
    pub subtitle_language: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            output_root: PathBuf::from("."),
            download_thumbnail: false,
            download_subtitles: false,
            subtitle_language: "en".to_string(),
        }
    }
}
