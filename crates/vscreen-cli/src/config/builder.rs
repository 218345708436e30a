use super::defaults::DefaultsConfig;
use super::file::{
    FileConfig, FileDockingConfig, FilePipelineConfig, FileSimilarityConfig, FileVinaConfig,
};
use super::models::{
    BoxCenter, DockingStep, FilterStep, InputSource, OutputTarget, ScreenConfig, SimilarityStep,
};
use crate::cli::{ScreenArgs, parse_triple};
use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};
use vscreen::core::io::format::Format;
use vscreen::engine::config::ScreeningConfigBuilder;
use vscreen::engine::similarity::SimilarityMethod;

/// Merges defaults, the config file, command-line flags and `-S` overrides, in increasing precedence.
pub fn build_config(args: &ScreenArgs, threads: Option<usize>) -> Result<ScreenConfig> {
    let defaults = DefaultsConfig::default();

    let mut file = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let mut set = apply_set_values(FileConfig::default(), &args.set_values)?;

    let pipeline_file = file.pipeline.take().unwrap_or_default();
    let pipeline_set = set.pipeline.take().unwrap_or_default();
    let vina_file = file.vina.take().unwrap_or_default();
    let vina_set = set.vina.take().unwrap_or_default();

    let n_cpu = pipeline_set
        .n_cpu
        .or(threads.map(|t| t.min(i32::MAX as usize) as i32))
        .or(pipeline_file.n_cpu)
        .unwrap_or(defaults.n_cpu);
    let chunk_size = pipeline_set
        .chunk_size
        .or(pipeline_file.chunk_size)
        .unwrap_or(defaults.chunk_size);
    let mut screening = ScreeningConfigBuilder::new().n_cpu(n_cpu).chunk_size(chunk_size);
    if let Some(executable) = vina_set.executable.or(args.vina.clone()).or(vina_file.executable) {
        screening = screening.vina_executable(executable);
    }
    let screening = screening.build()?;

    let input_format = pipeline_set
        .input_format
        .or(args.input_format.clone())
        .or(pipeline_file.input_format);
    let inputs = args
        .inputs
        .iter()
        .map(|path| {
            Ok(InputSource {
                path: path.clone(),
                format: resolve_format(input_format.as_deref(), path)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let output_format = pipeline_set
        .output_format
        .or(args.output_format.clone())
        .or(pipeline_file.output_format);
    let output = match (&args.output, &args.csv) {
        (Some(path), csv) => {
            let format = match output_format.as_deref() {
                Some(name) => parse_format(name)?,
                None => Format::from_path(path).unwrap_or(parse_format(defaults.output_format)?),
            };
            OutputTarget::Structures {
                path: path.clone(),
                format,
                csv: csv.clone(),
            }
        }
        (None, Some(csv)) => OutputTarget::Table(csv.clone()),
        (None, None) => {
            return Err(CliError::Argument(
                "nothing to write; pass an output file (-O) and/or --csv".to_string(),
            ));
        }
    };

    let filters = if args.filters.is_empty() {
        file.filter
            .drain(..)
            .map(|f| FilterStep {
                expression: f.expression,
                soft_fail: f.soft_fail,
            })
            .collect()
    } else {
        let soft_fail = args.soft_fail.unwrap_or(defaults.soft_fail);
        args.filters
            .iter()
            .map(|expression| FilterStep {
                expression: expression.clone(),
                soft_fail,
            })
            .collect()
    };

    let similarity = merge_similarity(
        args,
        set.similarity.take().unwrap_or_default(),
        file.similarity.take().unwrap_or_default(),
        &defaults,
    )?;
    let docking = merge_docking(
        args,
        set.docking.take().unwrap_or_default(),
        file.docking.take().unwrap_or_default(),
        &defaults,
    )?;
    let scoring = pipeline_set
        .score
        .or(args.score.clone())
        .or(pipeline_file.score);
    let receptor = pipeline_set
        .receptor
        .or(args.receptor.clone())
        .or(pipeline_file.receptor);

    let needs_receptor = docking.is_some()
        || scoring.is_some()
        || similarity.as_ref().is_some_and(|s| s.method.needs_protein());
    if needs_receptor && receptor.is_none() {
        return Err(CliError::Config(
            "a receptor is required for docking, scoring and interaction fingerprints".to_string(),
        ));
    }

    let config = ScreenConfig {
        inputs,
        output,
        screening,
        receptor,
        filters,
        similarity,
        docking,
        scoring,
    };
    debug!(?config, "Resolved screening configuration");
    Ok(config)
}

fn parse_format(name: &str) -> Result<Format> {
    Ok(name.parse::<Format>()?)
}

fn resolve_format(explicit: Option<&str>, path: &Path) -> Result<Format> {
    match explicit {
        Some(name) => parse_format(name),
        None => Format::from_path(path).ok_or_else(|| {
            CliError::Argument(format!(
                "cannot guess the format of '{}'; pass it with -i",
                path.display()
            ))
        }),
    }
}

fn merge_similarity(
    args: &ScreenArgs,
    set: FileSimilarityConfig,
    file: FileSimilarityConfig,
    defaults: &DefaultsConfig,
) -> Result<Option<SimilarityStep>> {
    let method = set.method.or(args.similarity.clone()).or(file.method);
    let query = set.query.or(args.query.clone()).or(file.query);
    let Some(method) = method else {
        if query.is_some() {
            warn!("A similarity query was given without a method; ignoring it");
        }
        return Ok(None);
    };
    let method: SimilarityMethod = method.parse()?;
    let query = query.ok_or_else(|| {
        CliError::Config(format!("similarity method '{method}' requires a query file"))
    })?;
    let cutoff = set
        .cutoff
        .or(args.cutoff)
        .or(file.cutoff)
        .unwrap_or(defaults.similarity_cutoff);
    Ok(Some(SimilarityStep {
        method,
        query,
        cutoff,
    }))
}

fn merge_docking(
    args: &ScreenArgs,
    set: FileDockingConfig,
    file: FileDockingConfig,
    defaults: &DefaultsConfig,
) -> Result<Option<DockingStep>> {
    let Some(engine) = set.engine.or(args.dock.clone()).or(file.engine) else {
        return Ok(None);
    };
    let center = set
        .center
        .map(BoxCenter::Point)
        .or(set.auto_ligand.map(BoxCenter::AutoLigand))
        .or(args.center.map(BoxCenter::Point))
        .or(args.auto_ligand.clone().map(BoxCenter::AutoLigand))
        .or(file.center.map(BoxCenter::Point))
        .or(file.auto_ligand.map(BoxCenter::AutoLigand))
        .ok_or_else(|| {
            CliError::Config("docking requires a box center or an auto-ligand file".to_string())
        })?;
    Ok(Some(DockingStep {
        engine,
        center,
        size: set.size.or(args.size).or(file.size).unwrap_or(defaults.box_size),
        exhaustiveness: set
            .exhaustiveness
            .or(args.exhaustiveness)
            .or(file.exhaustiveness)
            .unwrap_or(defaults.exhaustiveness),
        num_modes: set
            .num_modes
            .or(args.num_modes)
            .or(file.num_modes)
            .unwrap_or(defaults.num_modes),
        energy_range: set
            .energy_range
            .or(args.energy_range)
            .or(file.energy_range)
            .unwrap_or(defaults.energy_range),
        seed: set.seed.or(args.seed).or(file.seed),
    }))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {kind} value for {key}: {value}")))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{kv_pair}'. Expected KEY=VALUE."
            )));
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "pipeline.n-cpu" => {
                config.pipeline.get_or_insert_with(FilePipelineConfig::default).n_cpu =
                    Some(parse_value(key, value, "integer")?)
            }
            "pipeline.chunk-size" => {
                config.pipeline.get_or_insert_with(FilePipelineConfig::default).chunk_size =
                    Some(parse_value(key, value, "integer")?)
            }
            "pipeline.input-format" => {
                config.pipeline.get_or_insert_with(FilePipelineConfig::default).input_format = Some(value.to_string())
            }
            "pipeline.output-format" => {
                config.pipeline.get_or_insert_with(FilePipelineConfig::default).output_format = Some(value.to_string())
            }
            "pipeline.receptor" => {
                config.pipeline.get_or_insert_with(FilePipelineConfig::default).receptor = Some(PathBuf::from(value))
            }
            "pipeline.score" => {
                config.pipeline.get_or_insert_with(FilePipelineConfig::default).score = Some(value.to_string())
            }
            "vina.executable" => {
                config
                    .vina
                    .get_or_insert_with(FileVinaConfig::default)
                    .executable = Some(PathBuf::from(value))
            }
            "similarity.method" | "similarity.query" | "similarity.cutoff" => {
                let similarity = config.similarity.get_or_insert_with(Default::default);
                match key {
                    "similarity.method" => similarity.method = Some(value.to_string()),
                    "similarity.query" => similarity.query = Some(PathBuf::from(value)),
                    _ => similarity.cutoff = Some(parse_value(key, value, "float")?),
                }
            }
            _ if key.starts_with("docking.") => {
                let docking = config.docking.get_or_insert_with(Default::default);
                match key {
                    "docking.engine" => docking.engine = Some(value.to_string()),
                    "docking.auto-ligand" => docking.auto_ligand = Some(PathBuf::from(value)),
                    "docking.center" | "docking.size" => {
                        let triple = parse_triple(value)
                            .map_err(|e| CliError::Config(format!("Invalid value for {key}: {e}")))?;
                        if key == "docking.center" {
                            docking.center = Some(triple);
                        } else {
                            docking.size = Some(triple);
                        }
                    }
                    "docking.exhaustiveness" => {
                        docking.exhaustiveness = Some(parse_value(key, value, "integer")?)
                    }
                    "docking.num-modes" => {
                        docking.num_modes = Some(parse_value(key, value, "integer")?)
                    }
                    "docking.energy-range" => {
                        docking.energy_range = Some(parse_value(key, value, "float")?)
                    }
                    "docking.seed" => docking.seed = Some(parse_value(key, value, "integer")?),
                    _ => {
                        return Err(CliError::Config(format!(
                            "Unsupported configuration key for --set: '{key}'"
                        )));
                    }
                }
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{key}'"
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn base_args() -> ScreenArgs {
        ScreenArgs {
            inputs: vec![PathBuf::from("actives.sdf")],
            output: Some(PathBuf::from("hits.sdf")),
            ..Default::default()
        }
    }

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("screen.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_fill_a_minimal_run() {
        let config = build_config(&base_args(), Some(3)).unwrap();
        assert_eq!(config.inputs[0].format, Format::Sdf);
        assert_eq!(
            config.output,
            OutputTarget::Structures {
                path: PathBuf::from("hits.sdf"),
                format: Format::Sdf,
                csv: None,
            }
        );
        assert_eq!(config.screening.threads, 3);
        assert_eq!(config.screening.chunk_size, 100);
        assert!(config.filters.is_empty());
        assert!(config.similarity.is_none());
        assert!(config.docking.is_none());
    }

    #[test]
    fn file_values_are_used_and_flags_override_them() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
            [pipeline]
            chunk-size = 10
            receptor = "/data/receptor.pdb"

            [docking]
            engine = "autodock_vina"
            center = [1.0, 2.0, 3.0]
            exhaustiveness = 4

            [[filter]]
            expression = "ro5"
            soft-fail = 1
            "#,
        );
        let mut args = base_args();
        args.config = Some(path);
        let config = build_config(&args, None).unwrap();
        assert_eq!(config.screening.chunk_size, 10);
        assert_eq!(
            config.filters,
            vec![FilterStep {
                expression: "ro5".to_string(),
                soft_fail: 1
            }]
        );
        let docking = config.docking.unwrap();
        assert_eq!(docking.center, BoxCenter::Point([1.0, 2.0, 3.0]));
        assert_eq!(docking.exhaustiveness, 4);
        assert_eq!(docking.size, [20.0; 3]);

        args.filters = vec!["pains".to_string(), "mw < 300".to_string()];
        args.soft_fail = Some(2);
        args.exhaustiveness = Some(16);
        args.auto_ligand = Some(PathBuf::from("xtal.sdf"));
        let config = build_config(&args, None).unwrap();
        assert_eq!(config.filters.len(), 2);
        assert!(config.filters.iter().all(|f| f.soft_fail == 2));
        let docking = config.docking.unwrap();
        assert_eq!(docking.exhaustiveness, 16);
        assert_eq!(docking.center, BoxCenter::AutoLigand(PathBuf::from("xtal.sdf")));
    }

    #[test]
    fn set_values_override_flags() {
        let mut args = base_args();
        args.dock = Some("autodock_vina".to_string());
        args.receptor = Some(PathBuf::from("receptor.pdb"));
        args.center = Some([0.0; 3]);
        args.seed = Some(1);
        args.set_values = vec![
            "docking.seed=42".to_string(),
            "docking.size=10,12,14".to_string(),
            "pipeline.n-cpu=2".to_string(),
            "vina.executable=/opt/vina".to_string(),
        ];
        let config = build_config(&args, Some(8)).unwrap();
        let docking = config.docking.unwrap();
        assert_eq!(docking.seed, Some(42));
        assert_eq!(docking.size, [10.0, 12.0, 14.0]);
        assert_eq!(config.screening.threads, 2);
        assert_eq!(
            config.screening.vina_executable,
            Some(PathBuf::from("/opt/vina"))
        );
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        for bad in ["docking.seed", "docking.seed=abc", "docking.speed=1", "nope.key=1"] {
            let mut args = base_args();
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build_config(&args, None), Err(CliError::Config(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn similarity_needs_a_known_method_and_a_query() {
        let mut args = base_args();
        args.similarity = Some("sift".to_string());
        args.query = Some(PathBuf::from("q.sdf"));
        assert!(matches!(
            build_config(&args, None),
            Err(CliError::Screening(_))
        ));

        args.similarity = Some("USR".to_string());
        args.query = None;
        assert!(matches!(build_config(&args, None), Err(CliError::Config(_))));

        args.query = Some(PathBuf::from("q.sdf"));
        let similarity = build_config(&args, None).unwrap().similarity.unwrap();
        assert_eq!(similarity.method, SimilarityMethod::Usr);
        assert_eq!(similarity.cutoff, 0.9);
    }

    #[test]
    fn receptor_is_required_where_it_is_used() {
        let mut args = base_args();
        args.score = Some("autodock_vina".to_string());
        assert!(matches!(build_config(&args, None), Err(CliError::Config(_))));

        let mut args = base_args();
        args.similarity = Some("ifp".to_string());
        args.query = Some(PathBuf::from("q.sdf"));
        assert!(matches!(build_config(&args, None), Err(CliError::Config(_))));

        args.receptor = Some(PathBuf::from("receptor.pdb"));
        assert!(build_config(&args, None).is_ok());
    }

    #[test]
    fn docking_requires_a_center() {
        let mut args = base_args();
        args.dock = Some("autodock_vina".to_string());
        args.receptor = Some(PathBuf::from("receptor.pdb"));
        assert!(matches!(build_config(&args, None), Err(CliError::Config(_))));
    }

    #[test]
    fn formats_come_from_flags_or_extensions() {
        let mut args = base_args();
        args.inputs = vec![PathBuf::from("a.mol2"), PathBuf::from("b.unknown")];
        assert!(matches!(build_config(&args, None), Err(CliError::Argument(_))));

        args.input_format = Some("sdf".to_string());
        args.output = Some(PathBuf::from("poses.pdbqt"));
        let config = build_config(&args, None).unwrap();
        assert!(config.inputs.iter().all(|i| i.format == Format::Sdf));
        assert!(matches!(
            config.output,
            OutputTarget::Structures { format: Format::Pdbqt, csv: None, .. }
        ));

        args.output = None;
        assert!(matches!(build_config(&args, None), Err(CliError::Argument(_))));
        args.csv = Some(PathBuf::from("hits.csv"));
        assert_eq!(
            build_config(&args, None).unwrap().output,
            OutputTarget::Table(PathBuf::from("hits.csv"))
        );
        args.output = Some(PathBuf::from("hits.sdf"));
        assert!(matches!(
            build_config(&args, None).unwrap().output,
            OutputTarget::Structures { csv: Some(_), .. }
        ));
    }
}
