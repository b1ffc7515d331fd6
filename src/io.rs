//! File input/output.

pub mod output;
pub mod utils;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// How to handle existing files when writing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwriteMode {
    Always,
    Never,
    Ask,
}

/// How much to print while running.
#[derive(Clone)]
pub enum Verbosity {
    Quiet,
    Messages,
    Progress(ProgressStyle),
}

impl Verbosity {
    /// Whether non-critical status messages should be printed.
    pub fn print_messages(&self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Creates a progress bar with the given length, which is hidden
    /// unless progress was requested and stderr is a terminal.
    pub fn create_progress_bar(&self, len: usize) -> ProgressBar {
        match self {
            Self::Progress(style) if atty::is(atty::Stream::Stderr) => {
                let bar = ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr());
                bar.set_style(style.clone());
                bar
            }
            _ => ProgressBar::hidden(),
        }
    }
}
