use indexmap::IndexMap;

/// Renders a float the way annotation values are stored: shortest round-trip form with a fractional part.
pub fn format_value(value: f64) -> String {
    format!("{value:?}")
}

/// Extracts the affinity and the unweighted intermolecular terms from `--score_only` output.
///
/// Relevant lines either start with `Affinity:` or are indented by four
/// spaces (`    gauss 1     : 63.01213`). Spaces are removed from the term
/// name, which is lowercased and prefixed with `vina_`. Indented lines whose
/// value is not a number belong to other sections and are ignored.
/// Returns `None` when no affinity line is present.
pub fn parse_score_output(stdout: &str) -> Option<IndexMap<String, String>> {
    let mut terms = IndexMap::new();
    let mut has_affinity = false;
    for line in stdout.lines() {
        if !(line.starts_with("Affinity:") || line.starts_with("    ")) {
            continue;
        }
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let Some((name, value)) = compact.split_once(':') else {
            continue;
        };
        let value = value.trim_end_matches("(kcal/mol)");
        let Ok(number) = value.parse::<f64>() else {
            continue;
        };
        let name = name.to_lowercase();
        has_affinity |= name == "affinity";
        terms.insert(format!("vina_{name}"), format_value(number));
    }
    has_affinity.then_some(terms)
}
