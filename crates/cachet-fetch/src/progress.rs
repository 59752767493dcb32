use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;

/// Byte-progress sink driven by transports during a download.
///
/// All methods take `&self`; implementations use interior mutability where
/// they need state. Transports must work without a sink attached.
pub trait ProgressSink: Send + Sync {
    /// Announce the total transfer size, when the server reports one.
    fn set_total(&self, bytes: u64);

    /// Report cumulative bytes transferred so far.
    fn update(&self, bytes_done: u64);

    /// Rewind to zero, e.g. when a retry restarts the transfer.
    fn reset(&self);

    /// The transfer is over; release any display resources.
    fn close(&self);
}

const BAR_STYLE: &str =
    "{spinner:.blue} {prefix:>10.cyan.bold} {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

static BAR_TEMPLATE: Lazy<Option<ProgressStyle>> =
    Lazy::new(|| ProgressStyle::with_template(BAR_STYLE).ok());

/// Terminal progress bar backed by `indicatif`.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new(prefix: &str) -> Self {
        let bar = ProgressBar::no_length();
        if let Some(style) = BAR_TEMPLATE.as_ref() {
            bar.set_style(style.clone());
        }
        bar.set_prefix(prefix.to_string());
        Self { bar }
    }
}

impl ProgressSink for TerminalProgress {
    fn set_total(&self, bytes: u64) {
        self.bar.set_length(bytes);
    }

    fn update(&self, bytes_done: u64) {
        self.bar.set_position(bytes_done);
    }

    fn reset(&self) {
        self.bar.set_position(0);
    }

    fn close(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_progress_accepts_full_lifecycle() {
        let sink = TerminalProgress::new("download");
        sink.set_total(100);
        sink.update(10);
        sink.update(100);
        sink.reset();
        sink.close();
    }
}
