use std::path::PathBuf;

use engine_logging::{engine_debug, engine_trace, engine_warn};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tubefetch_core::{FormatChoice, Quality, QualityPlan, RawProgress};

use crate::ytdlp::{error_summary, YtDlpCommand};
use crate::{FailureKind, FetchError, FetchNotice, FetchOutput, FetchRequest, FetchSignal};

const PROGRESS_PREFIX: &str = "tf-progress ";
const META_PREFIX: &str = "tf-meta ";
const FILE_PREFIX: &str = "tf-file ";
const PROGRESS_TEMPLATE: &str = "download:tf-progress %(progress.downloaded_bytes)s \
     %(progress.total_bytes)s %(progress.total_bytes_estimate)s %(progress.speed)s %(info.ext)s";
const META_TEMPLATE: &str = "before_dl:tf-meta %(duration)s %(title)s";
const FILE_TEMPLATE: &str = "after_move:tf-file %(filepath)s";
const MAX_LINE_BYTES: usize = 64 * 1024;
/// Sidecar downloads that share the progress template but are not the media.
const SUBTITLE_EXTS: &[&str] = &[
    "vtt", "srt", "ass", "ssa", "ttml", "srv1", "srv2", "srv3", "json3", "lrc",
];

/// Receives progress from a running fetch.
pub trait ProgressHandler: Send + Sync {
    /// Returning [`FetchSignal::Cancel`] aborts the transfer.
    fn on_progress(&self, event: RawProgress) -> FetchSignal;

    fn on_notice(&self, notice: FetchNotice);
}

/// The media fetch capability: performs the transfer for one item.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &dyn ProgressHandler,
    ) -> Result<FetchOutput, FetchError>;
}

/// Fetcher backed by a yt-dlp child process.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher {
    command: YtDlpCommand,
}

impl YtDlpFetcher {
    pub fn new(command: YtDlpCommand) -> Self {
        Self { command }
    }

    async fn plan_quality(&self, request: &FetchRequest) -> Result<QualityPlan, FetchError> {
        match request.config.quality {
            Quality::ExactResolution(_) => {
                let heights = self.probe_heights(&request.url).await?;
                engine_debug!("Available heights for {}: {:?}", request.url, heights);
                Ok(request.config.quality.plan(&heights))
            }
            quality => Ok(quality.plan(&[])),
        }
    }

    async fn probe_heights(&self, url: &str) -> Result<Vec<u32>, FetchError> {
        let output = self
            .command
            .command()
            .args(["-J", "--no-playlist", "--no-warnings", "--", url])
            .output()
            .await
            .map_err(|err| FetchError::new(FailureKind::Spawn, err.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::new(
                FailureKind::ExitStatus(output.status.code()),
                error_summary(&stderr),
            ));
        }
        available_heights(&output.stdout)
    }
}

#[async_trait::async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: &dyn ProgressHandler,
    ) -> Result<FetchOutput, FetchError> {
        let plan = self.plan_quality(request).await?;
        if let Some(requested) = plan.fallback_from {
            progress.on_notice(FetchNotice::QualityFallback { requested });
        }

        let args = download_args(request, &plan);
        engine_debug!("Running {} {:?}", self.command.program, args);
        let mut child = self
            .command
            .command()
            .args(&args)
            .spawn()
            .map_err(|err| FetchError::new(FailureKind::Spawn, err.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::new(FailureKind::Io, "no stdout from downloader"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::new(FailureKind::Io, "no stderr from downloader"))?;
        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = FramedRead::new(stdout, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let mut streams = StreamFold::default();
        let mut output = FetchOutput::default();
        let mut cancelled = false;
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    engine_warn!("Unreadable downloader output: {}", err);
                    continue;
                }
            };
            match parse_output_line(&line) {
                Some(OutputLine::Progress(raw)) => {
                    if progress.on_progress(streams.apply(raw)) == FetchSignal::Cancel {
                        cancelled = true;
                        break;
                    }
                }
                Some(OutputLine::Metadata {
                    title,
                    duration_secs,
                }) => {
                    output.title = title.clone();
                    progress.on_notice(FetchNotice::Metadata {
                        title,
                        duration_secs,
                    });
                }
                Some(OutputLine::File(path)) => output.path = Some(path),
                Some(OutputLine::SidecarProgress) => {}
                None => engine_trace!("yt-dlp: {}", line),
            }
        }

        if cancelled {
            if let Err(err) = child.kill().await {
                engine_warn!("Failed to stop downloader: {}", err);
            }
            stderr_reader.abort();
            return Err(FetchError::new(FailureKind::Cancelled, "cancelled by user"));
        }

        let status = child
            .wait()
            .await
            .map_err(|err| FetchError::new(FailureKind::Io, err.to_string()))?;
        let stderr = stderr_reader.await.unwrap_or_default();
        if !status.success() {
            return Err(FetchError::new(
                FailureKind::ExitStatus(status.code()),
                error_summary(&stderr),
            ));
        }
        Ok(output)
    }
}

fn download_args(request: &FetchRequest, plan: &QualityPlan) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    match plan.choice {
        FormatChoice::Best => args.extend(["-f".into(), "bv*+ba/b".into()]),
        FormatChoice::Height(height) => args.extend([
            "-f".into(),
            format!("bv*[height={height}]+ba/b[height={height}]"),
        ]),
        FormatChoice::Audio => args.extend([
            "-f".into(),
            "ba/b".into(),
            "-x".into(),
            "--audio-format".into(),
            "mp3".into(),
        ]),
    }
    if request.config.write_subtitles {
        args.extend(["--write-subs".into(), "--write-auto-subs".into()]);
        if let Some(language) = &request.config.subtitle_language {
            args.extend(["--sub-langs".into(), language.clone()]);
        }
    }
    args.extend([
        "--no-playlist".into(),
        "--no-simulate".into(),
        "--newline".into(),
        "--progress".into(),
        "--progress-template".into(),
        PROGRESS_TEMPLATE.into(),
        "--print".into(),
        META_TEMPLATE.into(),
        "--print".into(),
        FILE_TEMPLATE.into(),
        "-o".into(),
        request.output_template.to_string_lossy().into_owned(),
        "--".into(),
        request.url.clone(),
    ]);
    args
}

#[derive(Debug, Clone, PartialEq)]
enum OutputLine {
    Progress(RawProgress),
    SidecarProgress,
    Metadata {
        title: Option<String>,
        duration_secs: Option<u64>,
    },
    File(PathBuf),
}

fn parse_output_line(line: &str) -> Option<OutputLine> {
    let line = line.trim_end_matches('\r');
    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.get(4).is_some_and(|ext| SUBTITLE_EXTS.contains(ext)) {
            return Some(OutputLine::SidecarProgress);
        }
        let mut numbers = fields.iter().take(4).map(|field| parse_number(field));
        let downloaded = numbers.next().flatten()?;
        let total = numbers.next().flatten();
        let estimate = numbers.next().flatten();
        let speed = numbers.next().flatten();
        return Some(OutputLine::Progress(RawProgress {
            downloaded: downloaded as u64,
            total: total.or(estimate).map(|value| value as u64),
            speed,
        }));
    }
    if let Some(rest) = line.strip_prefix(META_PREFIX) {
        let (duration, title) = rest.split_once(' ').unwrap_or((rest, ""));
        let title = title.trim();
        return Some(OutputLine::Metadata {
            title: (!title.is_empty() && title != "NA").then(|| title.to_string()),
            duration_secs: parse_number(duration).map(|secs| secs as u64),
        });
    }
    if let Some(rest) = line.strip_prefix(FILE_PREFIX) {
        let path = rest.trim();
        if !path.is_empty() && path != "NA" {
            return Some(OutputLine::File(PathBuf::from(path)));
        }
    }
    None
}

/// yt-dlp prints `NA`/`None` for unknown values and floats for estimates.
fn parse_number(field: &str) -> Option<f64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Folds the byte counters of consecutive streams (video, then audio) into
/// one non-decreasing counter for the item.
#[derive(Debug, Default)]
struct StreamFold {
    completed: u64,
    last_downloaded: u64,
    last_total: Option<u64>,
}

impl StreamFold {
    fn apply(&mut self, raw: RawProgress) -> RawProgress {
        if raw.downloaded < self.last_downloaded {
            let finished = self
                .last_total
                .unwrap_or(self.last_downloaded)
                .max(self.last_downloaded);
            self.completed += finished;
        }
        self.last_downloaded = raw.downloaded;
        self.last_total = raw.total;
        RawProgress {
            downloaded: self.completed + raw.downloaded,
            total: raw.total.map(|total| self.completed + total),
            speed: raw.speed,
        }
    }
}

#[derive(Deserialize)]
struct ProbeInfo {
    #[serde(default)]
    formats: Vec<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    height: Option<u32>,
    vcodec: Option<String>,
}

fn available_heights(json: &[u8]) -> Result<Vec<u32>, FetchError> {
    let info: ProbeInfo = serde_json::from_slice(json)
        .map_err(|err| FetchError::new(FailureKind::InvalidOutput, err.to_string()))?;
    let mut heights: Vec<u32> = info
        .formats
        .into_iter()
        .filter(|format| format.vcodec.as_deref() != Some("none"))
        .filter_map(|format| format.height)
        .collect();
    heights.sort_unstable();
    heights.dedup();
    Ok(heights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchConfig;

    #[test]
    fn progress_line_uses_estimate_when_total_is_missing() {
        let parsed = parse_output_line("tf-progress 1024 NA 4096.5 512.0");
        assert_eq!(
            parsed,
            Some(OutputLine::Progress(RawProgress {
                downloaded: 1024,
                total: Some(4096),
                speed: Some(512.0),
            }))
        );
    }

    #[test]
    fn progress_line_with_unknown_values() {
        let parsed = parse_output_line("tf-progress 10 NA NA None");
        assert_eq!(
            parsed,
            Some(OutputLine::Progress(RawProgress {
                downloaded: 10,
                total: None,
                speed: None,
            }))
        );
    }

    #[test]
    fn subtitle_progress_is_kept_out_of_the_item_counter() {
        assert_eq!(
            parse_output_line("tf-progress 2048 2048 NA 900.0 vtt"),
            Some(OutputLine::SidecarProgress)
        );
        assert_eq!(
            parse_output_line("tf-progress 10 100 NA NA webm"),
            Some(OutputLine::Progress(RawProgress {
                downloaded: 10,
                total: Some(100),
                speed: None,
            }))
        );
    }

    #[test]
    fn metadata_line_keeps_spaces_in_title() {
        let parsed = parse_output_line("tf-meta 212 Never Gonna Give You Up");
        assert_eq!(
            parsed,
            Some(OutputLine::Metadata {
                title: Some("Never Gonna Give You Up".to_string()),
                duration_secs: Some(212),
            })
        );
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        assert_eq!(parse_output_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_output_line("tf-progress NA NA NA NA"), None);
    }

    #[test]
    fn second_stream_continues_the_counter() {
        let mut fold = StreamFold::default();
        let raw = |downloaded, total| RawProgress {
            downloaded,
            total: Some(total),
            speed: None,
        };

        assert_eq!(fold.apply(raw(100, 100)).downloaded, 100);
        let second = fold.apply(raw(10, 50));
        assert_eq!(second.downloaded, 110);
        assert_eq!(second.total, Some(150));
    }

    #[test]
    fn probe_ignores_audio_only_formats() {
        let json = br#"{"formats":[
            {"height":null,"vcodec":"none"},
            {"height":360,"vcodec":"avc1"},
            {"height":720,"vcodec":"vp9"},
            {"height":360,"vcodec":"vp9"},
            {"height":1080,"vcodec":"none"}
        ]}"#;
        assert_eq!(available_heights(json).unwrap(), vec![360, 720]);
    }

    #[test]
    fn audio_only_requests_mp3_extraction() {
        let request = FetchRequest {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            output_template: PathBuf::from("/out/%(title)s.%(ext)s"),
            config: FetchConfig {
                quality: Quality::AudioOnly,
                write_subtitles: true,
                subtitle_language: Some("de".to_string()),
            },
        };
        let args = download_args(&request, &Quality::AudioOnly.plan(&[]));

        assert!(args.windows(2).any(|pair| pair == ["--audio-format", "mp3"]));
        assert!(args.contains(&"-x".to_string()));
        assert!(args.windows(2).any(|pair| pair == ["--sub-langs", "de"]));
        assert_eq!(args.last().map(String::as_str), Some(request.url.as_str()));
    }
}
