use crate::core::io::format::Format;
use crate::core::io::table;
use crate::core::models::molecule::Molecule;
use crate::engine::config::{DockingParams, ScreeningConfig, ScreeningConfigBuilder};
use crate::engine::error::ScreeningError;
use crate::engine::filters::Filter;
use crate::engine::parallel::{ChunkedMap, MoleculeStream, WorkerPool};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::similarity::{SimilarityMethod, SimilarityQuery};
use crate::engine::vina::Vina;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Name of the only supported scoring function and docking engine.
pub const AUTODOCK_VINA: &str = "autodock_vina";

/// A lazily evaluated virtual screening pipeline.
///
/// Each operation appends a stage to the pipe and returns immediately;
/// molecules are read and processed only when [`fetch`](Self::fetch),
/// [`write`](Self::write) or [`write_csv`](Self::write_csv) pull them.
/// Stages run chunk by chunk on the pipeline's worker pool, and the output
/// keeps the input order.
///
/// ```no_run
/// use vscreen::workflows::virtual_screening::VirtualScreening;
///
/// let mut vs = VirtualScreening::new(-1)?;
/// vs.load_ligands("sdf", "actives_final.sdf")?
///     .apply_filter("ro5", 1)?;
/// for molecule in vs.fetch() {
///     println!("{}", molecule?.title());
/// }
/// # Ok::<(), vscreen::engine::error::ScreeningError>(())
/// ```
pub struct VirtualScreening {
    config: ScreeningConfig,
    pool: WorkerPool,
    reporter: Arc<ProgressReporter<'static>>,
    pipe: Option<MoleculeStream>,
}

/// Counts from draining the pipe into files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteSummary {
    pub written: usize,
    /// Stream errors that were logged and skipped.
    pub skipped: usize,
}

/// The molecules left in a pipeline, produced on demand.
pub struct Fetch {
    inner: MoleculeStream,
}

impl Iterator for Fetch {
    type Item = Result<Molecule, ScreeningError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl VirtualScreening {
    /// Creates a pipeline; `n_cpu` of `-1` or `0` uses every logical core.
    pub fn new(n_cpu: i32) -> Result<Self, ScreeningError> {
        Self::with_config(ScreeningConfigBuilder::new().n_cpu(n_cpu).build()?)
    }

    pub fn with_config(config: ScreeningConfig) -> Result<Self, ScreeningError> {
        let pool = WorkerPool::new(config.threads)?;
        info!(
            threads = pool.threads(),
            chunk_size = config.chunk_size,
            "Created screening pipeline"
        );
        Ok(Self {
            config,
            pool,
            reporter: Arc::new(ProgressReporter::new()),
            pipe: None,
        })
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter<'static>) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    fn take_pipe(&mut self) -> MoleculeStream {
        self.pipe.take().unwrap_or_else(|| Box::new(std::iter::empty()))
    }

    fn push_source(&mut self, source: MoleculeStream) {
        self.pipe = Some(match self.pipe.take() {
            Some(existing) => Box::new(existing.chain(source)),
            None => source,
        });
    }

    fn push_stage<F>(&mut self, name: &'static str, op: F)
    where
        F: Fn(Molecule) -> Result<Vec<Molecule>, ScreeningError> + Send + Sync + 'static,
    {
        let upstream = self.take_pipe();
        self.pipe = Some(Box::new(ChunkedMap::new(
            upstream,
            name,
            Arc::new(op),
            self.pool.clone(),
            self.config.chunk_size,
            Arc::clone(&self.reporter),
        )));
        self.reporter.report(Progress::StageQueued { name });
    }

    /// Adds the molecules of a structure file; further calls append after the existing ones.
    ///
    /// The file is opened now but parsed lazily, one molecule at a time.
    #[instrument(skip_all, name = "load_ligands", fields(format = format, path = %path.as_ref().display()))]
    pub fn load_ligands(
        &mut self,
        format: &str,
        path: impl AsRef<Path>,
    ) -> Result<&mut Self, ScreeningError> {
        let format: Format = format.parse()?;
        let reader = format.open(path.as_ref())?;
        info!("Queued ligand source");
        self.push_source(Box::new(reader.map(|r| r.map_err(ScreeningError::from))));
        self.reporter.report(Progress::StageQueued { name: "load_ligands" });
        Ok(self)
    }

    /// Adds molecules that are already in memory.
    pub fn load_molecules(&mut self, molecules: Vec<Molecule>) -> &mut Self {
        self.push_source(Box::new(molecules.into_iter().map(Ok)));
        self.reporter.report(Progress::StageQueued { name: "load_molecules" });
        self
    }

    /// Annotates every molecule with Vina's score against `protein`.
    ///
    /// Adds `vina_affinity` and the unweighted terms `vina_gauss1`,
    /// `vina_gauss2`, `vina_repulsion`, `vina_hydrophobic` and
    /// `vina_hydrogen`.
    #[instrument(skip_all, name = "score", fields(function = function))]
    pub fn score(&mut self, function: &str, protein: &Molecule) -> Result<&mut Self, ScreeningError> {
        if !function.eq_ignore_ascii_case(AUTODOCK_VINA) {
            return Err(ScreeningError::UnknownScoringFunction(function.to_string()));
        }
        let vina = Arc::new(Vina::new(protein, self.config.vina_executable.as_deref())?);
        info!(executable = %vina.executable().display(), "Queued Vina scoring");
        self.push_stage("score", move |molecule: Molecule| {
            let title = molecule.title().to_string();
            vina.score(molecule)
                .map(|scored| vec![scored])
                .map_err(|source| ScreeningError::Vina { title, source })
        });
        Ok(self)
    }

    /// Replaces every ligand by its docked poses, best first.
    ///
    /// Each pose is a copy of the input molecule with new coordinates and the
    /// `vina_affinity`, `vina_rmsd_lb` and `vina_rmsd_ub` annotations.
    #[instrument(skip_all, name = "dock", fields(engine = engine))]
    pub fn dock(
        &mut self,
        engine: &str,
        protein: &Molecule,
        params: DockingParams,
    ) -> Result<&mut Self, ScreeningError> {
        if !engine.eq_ignore_ascii_case(AUTODOCK_VINA) {
            return Err(ScreeningError::UnknownDockingEngine(engine.to_string()));
        }
        let vina = Arc::new(Vina::new(protein, self.config.vina_executable.as_deref())?);
        info!(
            center = ?params.center,
            size = ?params.size,
            exhaustiveness = params.exhaustiveness,
            num_modes = params.num_modes,
            "Queued Vina docking"
        );
        self.push_stage("dock", move |molecule: Molecule| {
            vina.dock(&molecule, &params)
                .map_err(|source| ScreeningError::Vina {
                    title: molecule.title().to_string(),
                    source,
                })
        });
        Ok(self)
    }

    /// Keeps molecules that fail at most `soft_fail` rules of the filter.
    #[instrument(skip_all, name = "apply_filter", fields(expression = expression, soft_fail = soft_fail))]
    pub fn apply_filter(
        &mut self,
        expression: &str,
        soft_fail: usize,
    ) -> Result<&mut Self, ScreeningError> {
        let filter = Filter::parse(expression)?;
        info!(rules = filter.rules().len(), "Queued filter");
        self.push_stage("filter", move |molecule: Molecule| {
            Ok(if filter.passes(&molecule, soft_fail) {
                vec![molecule]
            } else {
                Vec::new()
            })
        });
        Ok(self)
    }

    /// Keeps molecules whose best similarity to any query molecule is at least `cutoff`.
    ///
    /// `ifp` and `sifp` compare interaction fingerprints against `protein`;
    /// the shape methods ignore it.
    #[instrument(skip_all, name = "similarity", fields(method = method, cutoff = cutoff))]
    pub fn similarity(
        &mut self,
        method: &str,
        query: &[Molecule],
        cutoff: f64,
        protein: Option<&Molecule>,
    ) -> Result<&mut Self, ScreeningError> {
        let method: SimilarityMethod = method.parse()?;
        let protein = method
            .needs_protein()
            .then(|| protein.cloned().map(Arc::new))
            .flatten();
        let query = SimilarityQuery::new(method, query, protein)?;
        info!("Queued similarity search");
        self.push_stage("similarity", move |molecule: Molecule| {
            Ok(if query.best_similarity(&molecule) >= cutoff {
                vec![molecule]
            } else {
                Vec::new()
            })
        });
        Ok(self)
    }

    /// Takes the pipe; a second call without new ligands yields nothing.
    pub fn fetch(&mut self) -> Fetch {
        Fetch {
            inner: self.take_pipe(),
        }
    }

    /// Drains the pipe into a structure file and, optionally, a CSV table of annotations.
    ///
    /// Errors carried by the stream are logged and skipped; I/O errors abort.
    #[instrument(skip_all, name = "write", fields(format = format, path = %path.as_ref().display()))]
    pub fn write(
        &mut self,
        format: &str,
        path: impl AsRef<Path>,
        csv_path: Option<&Path>,
    ) -> Result<WriteSummary, ScreeningError> {
        let format: Format = format.parse()?;
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        let mut rows = Vec::new();
        let mut summary = WriteSummary::default();
        let multi_model = matches!(format, Format::Pdbqt);

        self.reporter.report(Progress::TaskStart { name: "write" });
        for item in self.fetch() {
            let molecule = match item {
                Ok(molecule) => molecule,
                Err(e) => {
                    warn!(error = %e, "Skipping molecule");
                    summary.skipped += 1;
                    continue;
                }
            };
            if multi_model {
                writeln!(writer, "MODEL {}", summary.written + 1)?;
            }
            format.write(&molecule, &mut writer)?;
            if multi_model {
                writeln!(writer, "ENDMDL")?;
            }
            if csv_path.is_some() {
                rows.push(annotation_row(&molecule));
            }
            summary.written += 1;
            self.reporter.report(Progress::TaskIncrement);
        }
        writer.flush()?;
        self.reporter.report(Progress::TaskFinish);

        if let Some(csv_path) = csv_path {
            let columns = table::annotation_columns(&rows);
            table::write_annotations(&rows, &columns, File::create(csv_path)?)?;
        }
        info!(written = summary.written, skipped = summary.skipped, "Wrote molecules");
        Ok(summary)
    }

    /// Drains the pipe into a CSV file of titles and annotations.
    ///
    /// Columns are `fields` when given, otherwise the union of annotation
    /// keys in first-seen order.
    #[instrument(skip_all, name = "write_csv", fields(path = %path.as_ref().display()))]
    pub fn write_csv(
        &mut self,
        path: impl AsRef<Path>,
        fields: Option<&[String]>,
    ) -> Result<WriteSummary, ScreeningError> {
        let mut rows = Vec::new();
        let mut summary = WriteSummary::default();
        for item in self.fetch() {
            match item {
                Ok(molecule) => rows.push(annotation_row(&molecule)),
                Err(e) => {
                    warn!(error = %e, "Skipping molecule");
                    summary.skipped += 1;
                }
            }
        }
        let columns = match fields {
            Some(fields) => fields.to_vec(),
            None => table::annotation_columns(&rows),
        };
        table::write_annotations(&rows, &columns, File::create(path.as_ref())?)?;
        summary.written = rows.len();
        info!(written = summary.written, skipped = summary.skipped, "Wrote annotation table");
        Ok(summary)
    }
}

/// A structure-free copy holding only what a table row needs.
fn annotation_row(molecule: &Molecule) -> Molecule {
    let mut row = Molecule::new(molecule.title());
    *row.data_mut() = molecule.data().clone();
    row
}

impl std::fmt::Debug for VirtualScreening {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualScreening")
            .field("config", &self.config)
            .field("pipe", &self.pipe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;

    fn alkane(title: &str, carbons: usize) -> Molecule {
        let mut mol = Molecule::new(title);
        for i in 0..carbons {
            mol.add_atom(Atom::new(Element::C, Point3::new(i as f64 * 1.5, 0.0, 0.0)));
            if i > 0 {
                mol.add_bond(i - 1, i, BondOrder::Single).unwrap();
            }
        }
        mol.perceive();
        mol
    }

    fn titles(fetch: Fetch) -> Vec<String> {
        fetch.map(|m| m.unwrap().title().to_string()).collect()
    }

    #[test]
    fn fetch_is_one_shot() {
        let mut vs = VirtualScreening::new(2).unwrap();
        vs.load_molecules(vec![alkane("a", 2), alkane("b", 3)]);
        assert_eq!(titles(vs.fetch()), vec!["a", "b"]);
        assert_eq!(vs.fetch().count(), 0);
    }

    #[test]
    fn sources_chain_in_call_order() {
        let mut vs = VirtualScreening::new(1).unwrap();
        vs.load_molecules(vec![alkane("a", 2)])
            .load_molecules(vec![alkane("b", 2), alkane("c", 2)]);
        assert_eq!(titles(vs.fetch()), vec!["a", "b", "c"]);
    }

    #[test]
    fn filter_keeps_molecules_within_soft_fail() {
        let mut vs = VirtualScreening::new(2).unwrap();
        vs.load_molecules((1..=10).map(|n| alkane(&n.to_string(), n)).collect())
            .apply_filter("heavy_atoms <= 4; rings >= 1", 1)
            .unwrap();
        assert_eq!(titles(vs.fetch()), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn stages_after_fetch_apply_to_new_sources_only() {
        let mut vs = VirtualScreening::new(1).unwrap();
        vs.load_molecules(vec![alkane("old", 2)]);
        let _ = vs.fetch();
        vs.load_molecules(vec![alkane("new", 2)]);
        assert_eq!(titles(vs.fetch()), vec!["new"]);
    }

    #[test]
    fn unsupported_names_fail_at_call_time() {
        let mut vs = VirtualScreening::new(1).unwrap();
        let protein = Molecule::new("receptor");
        assert!(matches!(
            vs.score("rfscore_v1", &protein),
            Err(ScreeningError::UnknownScoringFunction(name)) if name == "rfscore_v1"
        ));
        let params = crate::engine::config::DockingParamsBuilder::new()
            .center(Point3::origin())
            .build()
            .unwrap();
        assert!(matches!(
            vs.dock("smina", &protein, params),
            Err(ScreeningError::UnknownDockingEngine(_))
        ));
        assert!(matches!(
            vs.similarity("sift", &[alkane("q", 3)], 0.5, None),
            Err(ScreeningError::UnknownSimilarityMethod(name)) if name == "sift"
        ));
        assert!(matches!(
            vs.apply_filter("mass < 3", 0),
            Err(ScreeningError::Filter { .. })
        ));
        assert!(matches!(
            vs.load_ligands("smi", "ligands.smi"),
            Err(ScreeningError::Format { .. })
        ));
    }

    #[test]
    fn reporter_sees_queued_stages() {
        use std::sync::Mutex;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut vs = VirtualScreening::new(1)
            .unwrap()
            .with_reporter(ProgressReporter::with_callback(Box::new(move |event| {
                if let Progress::StageQueued { name } = event {
                    sink.lock().unwrap().push(name);
                }
            })));
        vs.load_molecules(vec![alkane("a", 2)])
            .apply_filter("ro5", 0)
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["load_molecules", "filter"]);
    }
}
