//! Subcommand implementations.

mod acquire;
mod job;
mod process;
mod steps;

pub use acquire::acquire;
pub use job::{job, run};
pub use process::process;
pub use steps::steps;

use serde::Serialize;
use tokio::task::JoinHandle;

use image_harvest::progress::{self, ProgressSender};
use image_harvest::HarvestConfig;

use crate::display::ProgressDisplay;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: HarvestConfig,
    /// Print machine-readable JSON on stdout instead of text.
    pub json: bool,
    /// Suppress progress bars and text summaries.
    pub quiet: bool,
}

impl Context {
    pub fn new(config: HarvestConfig) -> Self {
        Self {
            config,
            json: false,
            quiet: false,
        }
    }

    fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Start the progress display when output is interactive.
    fn progress(&self) -> Progress {
        if !self.show_progress() {
            return Progress {
                tx: None,
                display: None,
            };
        }
        let (tx, rx) = progress::channel();
        Progress {
            tx: Some(tx),
            display: Some(ProgressDisplay::new().spawn(rx)),
        }
    }

    /// Print `report` as JSON, or `text` unless quiet.
    fn emit<T: Serialize>(&self, report: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else if !self.quiet {
            println!("{}", text());
        }
        Ok(())
    }
}

/// A progress sender paired with the task rendering it.
struct Progress {
    tx: Option<ProgressSender>,
    display: Option<JoinHandle<()>>,
}

impl Progress {
    fn sender(&self) -> Option<ProgressSender> {
        self.tx.clone()
    }

    /// Drop the last sender and wait for the display to drain.
    async fn finish(self) {
        drop(self.tx);
        if let Some(handle) = self.display {
            let _ = handle.await;
        }
    }
}
