use std::fs;
use std::io;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tubefetch_core::Quality;

/// Download YouTube videos, playlists and mixes through yt-dlp.
#[derive(Debug, Parser)]
#[command(name = "tubefetch", version, arg_required_else_help = true)]
pub struct Cli {
    /// Video, playlist or mix URL.
    pub url: Option<String>,

    /// Further URLs, downloaded after the first one.
    pub more_urls: Vec<String>,

    /// Read further URLs from FILE, one per line ('#' starts a comment).
    #[arg(short = 'a', long = "batch-file", value_name = "FILE")]
    pub batch_file: Option<PathBuf>,

    /// Output directory (default: the Downloads folder).
    #[arg(short, long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// highest, 720p, 480p, 360p, 240p, 144p or audio.
    #[arg(short, long, value_name = "QUALITY")]
    pub quality: Option<Quality>,

    /// Also save the video thumbnail.
    #[arg(long)]
    pub thumbnail: bool,

    /// Also save subtitles.
    #[arg(long)]
    pub subtitles: bool,

    #[arg(long, value_name = "LANG")]
    pub sub_lang: Option<String>,

    /// yt-dlp executable to run.
    #[arg(long = "yt-dlp", value_name = "PATH")]
    pub yt_dlp: Option<String>,

    /// Configuration file (default: ./tubefetch.ron, then the user config dir).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More diagnostics on the terminal (-vv for trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Contents of the batch field: extra positional URLs, then the batch file.
    pub fn batch_text(&self) -> io::Result<String> {
        let mut lines = self.more_urls.clone();
        if let Some(path) = &self.batch_file {
            let content = fs::read_to_string(path)?;
            lines.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.starts_with('#') && !line.starts_with(';'))
                    .map(str::to_string),
            );
        }
        Ok(lines.join("\n"))
    }
}
