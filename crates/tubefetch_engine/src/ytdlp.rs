use std::process::Stdio;

use tokio::process::Command;

/// How to launch yt-dlp: a program plus arguments placed before ours.
///
/// `leading_args` allows launchers such as `python -m yt_dlp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YtDlpCommand {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl Default for YtDlpCommand {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Command with piped stdout/stderr, killed if the handle is dropped.
    ///
    /// On unix the child runs in its own process group, out of reach of a
    /// terminal Ctrl-C; only the cancellation path stops it.
    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command
    }
}

/// Last meaningful stderr line, which is where yt-dlp puts its ERROR message.
pub(crate) fn error_summary(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .rev()
        .find(|line| line.starts_with("ERROR"))
        .or_else(|| stderr.lines().map(str::trim).rfind(|line| !line.is_empty()))
        .unwrap_or("no error output")
        .to_string()
}
