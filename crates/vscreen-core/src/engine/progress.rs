#[derive(Debug, Clone)]
pub enum Progress {
    /// A stage was appended to the pipeline; nothing runs until molecules are pulled.
    StageQueued { name: &'static str },
    /// A chunk of molecules went through a stage.
    ChunkFinish {
        stage: &'static str,
        input: usize,
        output: usize,
    },

    TaskStart { name: &'static str },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

impl std::fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn reporter_without_callback_is_silent() {
        ProgressReporter::new().report(Progress::TaskIncrement);
    }

    #[test]
    fn reporter_forwards_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if let Progress::StageQueued { name } = event {
                sink.lock().unwrap().push(name);
            }
        }));
        reporter.report(Progress::StageQueued { name: "filter" });
        reporter.report(Progress::TaskFinish);
        assert_eq!(*seen.lock().unwrap(), vec!["filter"]);
    }
}
