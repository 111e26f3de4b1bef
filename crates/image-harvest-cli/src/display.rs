//! Terminal progress bars driven by the library's progress channel.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use image_harvest::{ProgressEvent, ProgressReceiver};

const BAR_TEMPLATE: &str = "{spinner:.green} {prefix:>10} [{bar:30.cyan/blue}] {pos}/{len} {msg}";

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Renders acquisition and batch progress until every sender is dropped.
pub struct ProgressDisplay {
    multi: MultiProgress,
    acquire: Option<ProgressBar>,
    batch: Option<ProgressBar>,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            acquire: None,
            batch: None,
        }
    }

    /// Consume `rx` on a background task. The task ends once the channel closes.
    pub fn spawn(mut self, mut rx: ProgressReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.handle(&event),
                    Err(RecvError::Lagged(n)) => {
                        tracing::debug!("Progress display skipped {n} event(s)");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            self.finish();
        })
    }

    pub fn handle(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SourceStarted { source, quota } => {
                let bar = self.acquire_bar();
                if bar.length().is_none() || bar.position() == 0 {
                    bar.set_length(*quota as u64);
                }
                bar.set_message(source.clone());
            }
            ProgressEvent::UrlsDiscovered { source, count } => {
                self.acquire_bar()
                    .set_message(format!("{source}: {count} found"));
            }
            ProgressEvent::ImageSaved { .. } => self.acquire_bar().inc(1),
            ProgressEvent::DownloadFailed { .. } | ProgressEvent::SourceFinished { .. } => {}
            ProgressEvent::BatchStarted { total } => {
                if let Some(bar) = self.acquire.take() {
                    bar.finish();
                }
                let bar = self.multi.add(ProgressBar::new(*total as u64));
                bar.set_style(bar_style());
                bar.set_prefix("process");
                self.batch = Some(bar);
            }
            ProgressEvent::ImageProcessed { file, .. } => {
                if let Some(bar) = &self.batch {
                    bar.set_message(file.clone());
                    bar.inc(1);
                }
            }
            ProgressEvent::ImageSkipped { file, .. } => {
                if let Some(bar) = &self.batch {
                    bar.set_message(format!("skipped {file}"));
                    bar.inc(1);
                }
            }
            ProgressEvent::BatchComplete { .. } => {
                if let Some(bar) = self.batch.take() {
                    bar.finish_with_message("done");
                }
            }
        }
    }

    fn acquire_bar(&mut self) -> &ProgressBar {
        let multi = &self.multi;
        self.acquire.get_or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(0));
            bar.set_style(bar_style());
            bar.set_prefix("acquire");
            bar
        })
    }

    fn finish(&mut self) {
        for bar in [self.acquire.take(), self.batch.take()].into_iter().flatten() {
            bar.finish();
        }
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}
