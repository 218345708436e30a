use super::error::ScreeningError;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::molecule::Molecule;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A lazy, fallible stream of molecules.
pub type MoleculeStream = Box<dyn Iterator<Item = Result<Molecule, ScreeningError>> + Send>;

/// A per-molecule stage: zero molecules drop it, several expand it (docked poses).
pub type StageFn = Arc<dyn Fn(Molecule) -> Result<Vec<Molecule>, ScreeningError> + Send + Sync>;

/// The threads a pipeline runs its stages on.
#[derive(Clone)]
pub struct WorkerPool {
    threads: usize,
    #[cfg(feature = "parallel")]
    pool: Arc<rayon::ThreadPool>,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, ScreeningError> {
        let threads = threads.max(1);
        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("vscreen-worker-{i}"))
            .build()
            .map_err(|e| ScreeningError::ThreadPool(e.to_string()))?;
        Ok(Self {
            threads,
            #[cfg(feature = "parallel")]
            pool: Arc::new(pool),
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Applies `op` to every item, returning results in input order.
    pub fn map<T, R, F>(&self, items: Vec<T>, op: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        let results = self.pool.install(|| items.into_par_iter().map(op).collect());

        #[cfg(not(feature = "parallel"))]
        let results = items.into_iter().map(op).collect();

        results
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish()
    }
}

/// Iterator adaptor that pulls molecules in chunks and runs a stage over each chunk on the pool.
///
/// Errors from upstream are passed through in place; errors from the stage
/// replace the molecule that caused them. Output order follows input order.
pub struct ChunkedMap {
    upstream: MoleculeStream,
    stage: &'static str,
    op: StageFn,
    pool: WorkerPool,
    chunk_size: usize,
    reporter: Arc<ProgressReporter<'static>>,
    buffer: VecDeque<Result<Molecule, ScreeningError>>,
    exhausted: bool,
}

impl ChunkedMap {
    pub fn new(
        upstream: MoleculeStream,
        stage: &'static str,
        op: StageFn,
        pool: WorkerPool,
        chunk_size: usize,
        reporter: Arc<ProgressReporter<'static>>,
    ) -> Self {
        Self {
            upstream,
            stage,
            op,
            pool,
            chunk_size: chunk_size.max(1),
            reporter,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) {
        let chunk: Vec<_> = self.upstream.by_ref().take(self.chunk_size).collect();
        if chunk.len() < self.chunk_size {
            self.exhausted = true;
        }
        if chunk.is_empty() {
            return;
        }
        let input = chunk.len();
        let op = Arc::clone(&self.op);
        let results = self.pool.map(chunk, move |item| item.and_then(|m| op(m)));

        for result in results {
            match result {
                Ok(molecules) => self.buffer.extend(molecules.into_iter().map(Ok)),
                Err(e) => self.buffer.push_back(Err(e)),
            }
        }
        let output = self.buffer.len();
        trace!(stage = self.stage, input, output, "Processed chunk");
        self.reporter.report(Progress::ChunkFinish {
            stage: self.stage,
            input,
            output,
        });
    }
}

impl Iterator for ChunkedMap {
    type Item = Result<Molecule, ScreeningError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.is_empty() && !self.exhausted {
            self.fill();
        }
        self.buffer.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stage(
        f: impl Fn(Molecule) -> Result<Vec<Molecule>, ScreeningError> + Send + Sync + 'static,
    ) -> StageFn {
        Arc::new(f)
    }

    fn numbered(n: usize) -> MoleculeStream {
        Box::new((0..n).map(|i| Ok::<_, ScreeningError>(Molecule::new(&i.to_string()))))
    }

    fn titles(stream: impl Iterator<Item = Result<Molecule, ScreeningError>>) -> Vec<String> {
        stream
            .map(|m| m.map(|m| m.title().to_string()).unwrap_or_else(|e| format!("err:{e}")))
            .collect()
    }

    #[test]
    fn preserves_order_across_chunks_and_threads() {
        let pool = WorkerPool::new(4).unwrap();
        let op = stage(|m| {
            let keep = m.title().parse::<usize>().unwrap() % 3 != 0;
            Ok(if keep { vec![m] } else { Vec::new() })
        });
        let stream = ChunkedMap::new(numbered(50), "filter", op, pool, 7, Arc::default());
        let expected: Vec<String> = (0..50).filter(|i| i % 3 != 0).map(|i| i.to_string()).collect();
        assert_eq!(titles(stream), expected);
    }

    #[test]
    fn expands_and_passes_errors_through_in_place() {
        let pool = WorkerPool::new(2).unwrap();
        let upstream: MoleculeStream = Box::new(
            vec![
                Ok(Molecule::new("a")),
                Err(ScreeningError::UnknownSimilarityMethod("x".into())),
                Ok(Molecule::new("b")),
            ]
            .into_iter(),
        );
        let op = stage(|m| {
            if m.title() == "b" {
                return Err(ScreeningError::EmptyQuery { method: "usr".into() });
            }
            Ok(vec![m.clone(), m])
        });
        let stream = ChunkedMap::new(upstream, "dock", op, pool, 100, Arc::default());
        let out = titles(stream);
        assert_eq!(out.len(), 4);
        assert_eq!(&out[..2], ["a", "a"]);
        assert!(out[2].starts_with("err:Similarity method 'x'"));
        assert!(out[3].starts_with("err:No query molecule"));
    }

    #[test]
    fn pulls_only_what_is_needed() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let upstream: MoleculeStream = Box::new((0..1000).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ScreeningError>(Molecule::new(&i.to_string()))
        }));
        let op = stage(|m| Ok(vec![m]));
        let mut stream = ChunkedMap::new(upstream, "noop", op, WorkerPool::new(1).unwrap(), 10, Arc::default());
        assert_eq!(pulled.load(Ordering::SeqCst), 0);
        stream.next().unwrap().unwrap();
        assert_eq!(pulled.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn reports_chunks() {
        let chunks = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&chunks);
        let reporter = Arc::new(ProgressReporter::with_callback(Box::new(move |event| {
            if let Progress::ChunkFinish { .. } = event {
                sink.fetch_add(1, Ordering::SeqCst);
            }
        })));
        let op = stage(|m| Ok(vec![m]));
        let stream = ChunkedMap::new(numbered(25), "noop", op, WorkerPool::new(1).unwrap(), 10, reporter);
        assert_eq!(stream.count(), 25);
        assert_eq!(chunks.load(Ordering::SeqCst), 3);
    }
}
