#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing shared by the `nicd` subcommands.
//!
//! [`IndicatifProgress`] renders [`ProgressCallback`] events as `indicatif`
//! bars, and [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge` so log lines are printed above the bars instead
//! of tearing through them.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use nicd_report::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// What a bar counts. Selects its colours and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    /// Report documents; the count is only known after discovery.
    Documents,
    /// Calendar days of a download range.
    Days,
}

impl Unit {
    fn waiting_style(self) -> ProgressStyle {
        let template = match self {
            Self::Documents => "{spinner:.cyan} {msg}",
            Self::Days => "{spinner:.green} {msg}",
        };
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn counting_style(self) -> ProgressStyle {
        let template = match self {
            Self::Documents => "  {wide_msg} {bar:30.cyan/dim} {pos}/{len} docs [{eta}]",
            Self::Days => "  {wide_msg} {bar:30.green/dim} {pos}/{len} days [{elapsed_precise}]",
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

/// Progress reporting backed by an `indicatif` [`ProgressBar`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    unit: Unit,
}

impl IndicatifProgress {
    fn attach(multi: &MultiProgress, unit: Unit, message: &str, total: Option<u64>) -> Self {
        let bar = multi.add(ProgressBar::no_length());
        bar.set_message(message.to_string());
        let progress = Self { bar, unit };
        match total {
            Some(total) => progress.set_total(total),
            None => {
                progress.bar.set_style(unit.waiting_style());
                progress.bar.enable_steady_tick(Duration::from_millis(120));
            }
        }
        progress
    }

    /// Bar for a run over report documents. Spins while the input
    /// directory is searched and starts counting on
    /// [`ProgressCallback::set_total`].
    #[must_use]
    pub fn documents_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::attach(multi, Unit::Documents, message, None))
    }

    /// Bar for a download over `total` days.
    #[must_use]
    pub fn steps_bar(
        multi: &MultiProgress,
        message: &str,
        total: u64,
    ) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::attach(multi, Unit::Days, message, Some(total)))
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.disable_steady_tick();
        self.bar.set_length(total);
        self.bar.reset();
        self.bar.set_style(self.unit.counting_style());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger and returns the [`MultiProgress`] every bar
/// must be added to.
///
/// Defaults to `info`; `RUST_LOG` overrides it (e.g.
/// `RUST_LOG=nicd_report=debug`).
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::*;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn documents_bar_counts_once_total_is_known() {
        let multi = hidden();
        let progress = IndicatifProgress::attach(&multi, Unit::Documents, "Extracting", None);
        assert_eq!(progress.bar.length(), None);

        progress.set_total(3);
        progress.inc(2);
        assert_eq!(progress.bar.length(), Some(3));
        assert_eq!(progress.bar.position(), 2);

        progress.finish("done".to_string());
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn days_bar_starts_with_length() {
        let multi = hidden();
        let progress = IndicatifProgress::attach(&multi, Unit::Days, "Fetching", Some(7));
        assert_eq!(progress.bar.length(), Some(7));
        assert_eq!(progress.bar.position(), 0);
    }
}
