use dataforge_core::{ReadError, TabularRecord};

/// Column separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = "\t";

/// Parse separator-delimited plain text.
///
/// Each non-blank line is one row; cells are trimmed. There is no header
/// line, so columns are labeled `Column_1..Column_N`.
pub fn parse_text(input: &str, separator: &str) -> Result<TabularRecord, ReadError> {
    if separator.is_empty() {
        return Err(ReadError::InvalidSeparator);
    }

    let rows: Vec<Vec<String>> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split(separator).map(|cell| cell.trim().to_string()).collect())
        .collect();

    Ok(TabularRecord::with_synthetic_headers(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_separated_lines() {
        let record = parse_text("a\tb\tc\nd\te\tf\n", DEFAULT_SEPARATOR).unwrap();
        assert_eq!(record.columns(), ["Column_1", "Column_2", "Column_3"]);
        assert_eq!(record.rows(), [vec!["a", "b", "c"], vec!["d", "e", "f"]]);
    }

    #[test]
    fn test_blank_lines_skipped_and_cells_trimmed() {
        let input = "  a ; b  \n\n   \n c;d\r\n";
        let record = parse_text(input, ";").unwrap();
        assert_eq!(record.rows(), [vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_ragged_lines_padded_to_widest() {
        let record = parse_text("a\nb\tc\td\n", "\t").unwrap();
        assert_eq!(record.column_count(), 3);
        assert_eq!(record.rows()[0], vec!["a", "", ""]);
    }

    #[test]
    fn test_multi_character_separator() {
        let record = parse_text("x::y::z", "::").unwrap();
        assert_eq!(record.rows(), [vec!["x", "y", "z"]]);
    }

    #[test]
    fn test_only_blank_lines_is_empty() {
        assert_eq!(parse_text("\n  \n\t\n", "\t").unwrap(), TabularRecord::empty());
    }

    #[test]
    fn test_empty_separator_rejected() {
        let err = parse_text("a,b", "").unwrap_err();
        assert!(matches!(err, ReadError::InvalidSeparator));
    }
}
