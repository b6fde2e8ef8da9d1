use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use tubefetch_core::{AppViewModel, Percent, ProgressRecord};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BAR_TEMPLATE: &str = "{prefix} [{bar:30.cyan/blue}] {pos:>3}% {msg}";

/// Terminal presentation of the view model: timestamped log lines plus one
/// progress bar for the item in flight.
#[derive(Default)]
pub struct Renderer {
    printed_lines: usize,
    bar: Option<(usize, ProgressBar)>,
}

impl Renderer {
    pub fn render(&mut self, view: &AppViewModel) {
        for line in self.unprinted(view) {
            let stamped = format!("[{}] {}", Local::now().format("%H:%M:%S"), line);
            match &self.bar {
                Some((_, bar)) => bar.suspend(|| println!("{stamped}")),
                None => println!("{stamped}"),
            }
        }
        self.printed_lines = view.log_start + view.log_lines.len();

        match &view.progress {
            Some(record) => self.show_progress(record),
            None => self.clear_bar(),
        }
    }

    fn unprinted<'v>(&self, view: &'v AppViewModel) -> &'v [String] {
        let seen = self.printed_lines.saturating_sub(view.log_start);
        view.log_lines.get(seen..).unwrap_or_default()
    }

    pub fn finish(&mut self) {
        self.clear_bar();
    }

    fn show_progress(&mut self, record: &ProgressRecord) {
        if self
            .bar
            .as_ref()
            .is_some_and(|(index, _)| *index != record.item_index)
        {
            self.clear_bar();
        }
        let (_, bar) = self
            .bar
            .get_or_insert_with(|| (record.item_index, new_bar(record)));
        if let Some(whole) = record.percent.whole() {
            bar.set_position(u64::from(whole.min(100)));
        }
        bar.set_message(status_text(record));
    }

    fn clear_bar(&mut self) {
        if let Some((_, bar)) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn new_bar(record: &ProgressRecord) -> ProgressBar {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let bar = ProgressBar::new(100).with_style(style);
    bar.set_prefix(format!("[{}/{}]", record.item_index, record.item_count));
    bar
}

/// `label  3.1 MB of 10.0 MB  1.5 MB/s  ETA 4s`, omitting unknown parts.
pub fn status_text(record: &ProgressRecord) -> String {
    let mut parts = vec![record.label.clone()];
    parts.push(match (record.total, record.percent) {
        (Some(total), Percent::Known(_)) => format!(
            "{} of {}",
            format_megabytes(record.downloaded),
            format_megabytes(total)
        ),
        _ => format_megabytes(record.downloaded),
    });
    if let Some(speed) = record.speed {
        parts.push(format!("{:.1} MB/s", speed / BYTES_PER_MB));
    }
    if let Some(eta) = record.eta_secs {
        parts.push(format!("ETA {}", format_duration(eta)));
    }
    parts.join("  ")
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / BYTES_PER_MB)
}

fn format_duration(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m{:02}s", secs / 60, secs % 60),
        _ => format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60),
    }
}
