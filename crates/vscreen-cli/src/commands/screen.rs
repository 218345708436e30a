use super::{read_first, read_molecules};
use crate::cli::ScreenArgs;
use crate::config::{self, BoxCenter, DockingStep, OutputTarget};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use nalgebra::Point3;
use tracing::info;
use vscreen::engine::config::{DockingParams, DockingParamsBuilder};
use vscreen::engine::progress::ProgressReporter;
use vscreen::workflows::virtual_screening::VirtualScreening;

fn docking_params(step: &DockingStep) -> Result<DockingParams> {
    let [x, y, z] = step.size;
    let mut builder = DockingParamsBuilder::new()
        .size(x, y, z)
        .exhaustiveness(step.exhaustiveness)
        .num_modes(step.num_modes)
        .energy_range(step.energy_range);
    builder = match &step.center {
        BoxCenter::Point([x, y, z]) => builder.center(Point3::new(*x, *y, *z)),
        BoxCenter::AutoLigand(path) => builder.auto_ligand(&read_first(path)?),
    };
    if let Some(seed) = step.seed {
        builder = builder.seed(seed);
    }
    Ok(builder.build()?)
}

pub fn run(args: ScreenArgs, threads: Option<usize>, quiet: bool) -> Result<()> {
    let config = config::build_config(&args, threads)?;

    let receptor = match &config.receptor {
        Some(path) => {
            info!(path = %path.display(), "Loading receptor");
            let mut protein = read_first(path)?;
            protein.set_protein(true);
            Some(protein)
        }
        None => None,
    };
    let protein = || {
        receptor
            .as_ref()
            .ok_or_else(|| CliError::Config("a receptor is required".to_string()))
    };

    let progress_handler = CliProgressHandler::new(quiet);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut vs = VirtualScreening::with_config(config.screening.clone())?.with_reporter(reporter);

    for input in &config.inputs {
        vs.load_ligands(&input.format.to_string(), &input.path)?;
    }
    for filter in &config.filters {
        vs.apply_filter(&filter.expression, filter.soft_fail)?;
    }
    if let Some(similarity) = &config.similarity {
        let query = read_molecules(&similarity.query)?;
        vs.similarity(
            similarity.method.name(),
            &query,
            similarity.cutoff,
            receptor.as_ref(),
        )?;
    }
    if let Some(docking) = &config.docking {
        vs.dock(&docking.engine, protein()?, docking_params(docking)?)?;
    }
    if let Some(function) = &config.scoring {
        vs.score(function, protein()?)?;
    }

    println!("Screening {} file(s)...", config.inputs.len());
    let summary = match &config.output {
        OutputTarget::Structures { path, format, csv } => {
            let summary = vs.write(&format.to_string(), path, csv.as_deref())?;
            println!("✓ {} molecule(s) written to: {}", summary.written, path.display());
            summary
        }
        OutputTarget::Table(csv) => {
            let summary = vs.write_csv(csv, None)?;
            println!("✓ {} row(s) written to: {}", summary.written, csv.display());
            summary
        }
    };
    if summary.skipped > 0 {
        println!(
            "  {} molecule(s) were skipped because of errors; rerun with -v for details.",
            summary.skipped
        );
    }
    info!(written = summary.written, skipped = summary.skipped, "Screening finished");
    Ok(())
}
