use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use vscreen::engine::progress::{Progress, ProgressCallback};

const SPINNER_TICK_MS: u64 = 80;

/// Renders pipeline progress as a spinner on stderr.
///
/// The pipeline is lazy, so the number of molecules is unknown until the
/// stream is drained; the spinner counts written molecules and shows the
/// last chunk statistics of each stage.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new(hidden: bool) -> Self {
        let pb = ProgressBar::new_spinner()
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(if hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        });
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::StageQueued { name } => {
                    debug!(stage = name, "Stage queued");
                }
                Progress::ChunkFinish {
                    stage,
                    input,
                    output,
                } => {
                    pb_guard.set_message(format!("{stage}: {output}/{input} kept in last chunk"));
                }
                Progress::TaskStart { name } => {
                    pb_guard.reset();
                    pb_guard.set_style(Self::spinner_style());
                    pb_guard.set_prefix(name);
                    pb_guard.set_message("");
                    pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                }
                Progress::TaskIncrement => {
                    pb_guard.inc(1);
                }
                Progress::TaskFinish => {
                    pb_guard.disable_steady_tick();
                    let done = pb_guard.position();
                    pb_guard.finish_with_message(format!("✓ {done} molecules"));
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {msg}"));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {pos} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new(true);
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.position(), 0);
        assert!(pb.is_finished());
    }

    #[test]
    fn callback_tracks_written_molecules() {
        let handler = CliProgressHandler::new(true);
        let callback = handler.get_callback();

        callback(Progress::TaskStart { name: "write" });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.prefix(), "write");
            assert!(!pb.is_finished());
        }

        callback(Progress::ChunkFinish {
            stage: "filter",
            input: 100,
            output: 42,
        });
        callback(Progress::TaskIncrement);
        callback(Progress::TaskIncrement);
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.position(), 2);
            assert_eq!(pb.message(), "filter: 42/100 kept in last chunk");
        }

        callback(Progress::TaskFinish);
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ 2 molecules");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new(true);
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::StageQueued { name: "dock" });
            callback(Progress::TaskStart { name: "write" });
            callback(Progress::TaskIncrement);
            callback(Progress::TaskFinish);
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 1);
    }
}
