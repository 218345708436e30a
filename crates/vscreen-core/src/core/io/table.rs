use crate::core::models::molecule::Molecule;
use indexmap::IndexSet;
use std::io::Write;

/// Column names for an annotation table: the union of annotation keys in first-seen order.
pub fn annotation_columns<'a>(molecules: impl IntoIterator<Item = &'a Molecule>) -> Vec<String> {
    let mut columns: IndexSet<&str> = IndexSet::new();
    for molecule in molecules {
        columns.extend(molecule.data().keys().map(String::as_str));
    }
    columns.into_iter().map(str::to_string).collect()
}

/// Writes a table with one row per molecule: its title followed by the requested annotations.
///
/// Missing annotations are written as empty cells.
pub fn write_annotations<W: Write>(
    molecules: &[Molecule],
    columns: &[String],
    writer: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut header = Vec::with_capacity(columns.len() + 1);
    header.push("name");
    header.extend(columns.iter().map(String::as_str));
    writer.write_record(&header)?;
    for molecule in molecules {
        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(molecule.title());
        row.extend(
            columns
                .iter()
                .map(|c| molecule.data().get(c).map_or("", String::as_str)),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated(title: &str, pairs: &[(&str, &str)]) -> Molecule {
        let mut molecule = Molecule::new(title);
        for (k, v) in pairs {
            molecule.data_mut().insert(k.to_string(), v.to_string());
        }
        molecule
    }

    #[test]
    fn columns_are_union_in_first_seen_order() {
        let molecules = vec![
            annotated("a", &[("vina_affinity", "-7.1"), ("mw", "300")]),
            annotated("b", &[("mw", "250"), ("logp", "2.0")]),
        ];
        assert_eq!(
            annotation_columns(&molecules),
            vec!["vina_affinity", "mw", "logp"]
        );
    }

    #[test]
    fn writes_title_column_and_blank_missing_cells() {
        let molecules = vec![
            annotated("a", &[("x", "1")]),
            annotated("b, with comma", &[("y", "2")]),
        ];
        let columns = annotation_columns(&molecules);
        let mut buffer = Vec::new();
        write_annotations(&molecules, &columns, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "name,x,y\na,1,\n\"b, with comma\",,2\n");
    }
}
