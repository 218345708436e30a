use crate::cli::DescribeArgs;
use crate::error::{CliError, Result};
use std::io::Write;
use tracing::{info, warn};
use vscreen::core::descriptors::Descriptor;
use vscreen::core::io::format::Format;
use vscreen::core::io::table;
use vscreen::core::models::molecule::Molecule;

fn format_descriptor(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.3}")
    }
}

/// A title-only molecule annotated with every descriptor of `molecule`.
fn describe(molecule: &Molecule) -> Molecule {
    let mut row = Molecule::new(molecule.title());
    for descriptor in Descriptor::ALL {
        row.data_mut().insert(
            descriptor.name().to_string(),
            format_descriptor(descriptor.compute(molecule)),
        );
    }
    row
}

pub fn run(args: DescribeArgs, out: impl Write) -> Result<()> {
    let format = match &args.input_format {
        Some(name) => name.parse::<Format>()?,
        None => Format::from_path(&args.input).ok_or_else(|| {
            CliError::Argument(format!(
                "cannot guess the format of '{}'; pass it with -i",
                args.input.display()
            ))
        })?,
    };

    let mut rows = Vec::new();
    for item in format.open(&args.input)? {
        match item {
            Ok(molecule) => rows.push(describe(&molecule)),
            Err(e) => warn!(error = %e, "Skipping unreadable molecule"),
        }
    }
    let columns: Vec<String> = Descriptor::ALL.iter().map(|d| d.name().to_string()).collect();
    table::write_annotations(&rows, &columns, out).map_err(|e| CliError::Other(e.into()))?;
    info!(molecules = rows.len(), "Described molecules");
    Ok(())
}
