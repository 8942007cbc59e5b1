//! Parser for the curated variant catalog.
//!
//! The catalog is tab-separated with columns `category, gene, variant_id,
//! description`. Older sections of the file omit the category column, so a
//! row's shape is chosen by its field count rather than by guessing at
//! content.

use thiserror::Error;

use crate::utils::validation::check_row_limit;

/// Catalog row problems. Row numbers are 1-based line numbers.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {row}: expected 2 to 4 fields, found {found}")]
    FieldCount { row: usize, found: usize },

    #[error("Line {row}: empty {field}")]
    EmptyField { row: usize, field: &'static str },

    #[error("{0}")]
    TooManyRows(String),
}

impl ParseError {
    /// Row the error refers to, if it is a per-row error
    #[must_use]
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::FieldCount { row, .. } | Self::EmptyField { row, .. } => Some(*row),
            Self::Io(_) | Self::TooManyRows(_) => None,
        }
    }
}

/// Shape of a catalog row, discriminated by field count
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRow {
    /// `category, gene, variant_id, description`
    Full {
        category: String,
        gene: String,
        variant_id: String,
        description: String,
    },
    /// `gene, variant_id[, description]`; category omitted
    Short {
        gene: String,
        variant_id: String,
        description: String,
    },
}

impl RawRow {
    #[must_use]
    pub fn gene(&self) -> &str {
        match self {
            Self::Full { gene, .. } | Self::Short { gene, .. } => gene,
        }
    }

    #[must_use]
    pub fn variant_id(&self) -> &str {
        match self {
            Self::Full { variant_id, .. } | Self::Short { variant_id, .. } => variant_id,
        }
    }
}

/// A parsed row and the line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub line_number: usize,
    pub row: RawRow,
}

/// Rows that parsed, plus per-row errors for the ones that did not
#[derive(Debug, Default)]
pub struct CatalogRows {
    pub rows: Vec<ParsedRow>,
    pub errors: Vec<ParseError>,
}

/// Parse catalog text.
///
/// Blank lines and `#` comments are ignored, and a header row is skipped if
/// the first data line looks like one.
///
/// # Errors
///
/// Returns `ParseError::TooManyRows` if the row limit is exceeded.
pub fn parse_catalog_text(text: &str) -> Result<CatalogRows, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut out = CatalogRows::default();
    let mut first_data_line = true;

    for (i, line) in text.lines().enumerate() {
        let line_number = i + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();

        if first_data_line {
            first_data_line = false;
            if is_header(&fields) {
                continue;
            }
        }

        if check_row_limit(out.rows.len()).is_some() {
            return Err(ParseError::TooManyRows(format!(
                "Catalog exceeds {} rows",
                crate::utils::validation::MAX_CATALOG_ROWS
            )));
        }

        match parse_row(&fields, line_number) {
            Ok(row) => out.rows.push(ParsedRow { line_number, row }),
            Err(e) => out.errors.push(e),
        }
    }

    Ok(out)
}

fn is_header(fields: &[&str]) -> bool {
    fields.iter().any(|f| {
        matches!(
            f.to_lowercase().as_str(),
            "rsid" | "rs id" | "variant_id" | "variant id" | "snp"
        )
    })
}

fn parse_row(fields: &[&str], row: usize) -> Result<RawRow, ParseError> {
    let parsed = match *fields {
        [category, gene, variant_id, description] => RawRow::Full {
            category: category.to_string(),
            gene: gene.to_string(),
            variant_id: variant_id.to_string(),
            description: description.to_string(),
        },
        [gene, variant_id, description] => RawRow::Short {
            gene: gene.to_string(),
            variant_id: variant_id.to_string(),
            description: description.to_string(),
        },
        [gene, variant_id] => RawRow::Short {
            gene: gene.to_string(),
            variant_id: variant_id.to_string(),
            description: String::new(),
        },
        _ => {
            return Err(ParseError::FieldCount {
                row,
                found: fields.len(),
            })
        }
    };

    if parsed.gene().is_empty() {
        return Err(ParseError::EmptyField { row, field: "gene" });
    }
    if parsed.variant_id().is_empty() {
        return Err(ParseError::EmptyField {
            row,
            field: "variant identifier",
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_shapes() {
        let tsv = "CYP2D6\trs3892097\tDrug metabolism\n\
                   Neurotransmitter\tCOMT\trs4680\tDopamine breakdown\n\
                   BDNF\trs6265\n";

        let parsed = parse_catalog_text(tsv).unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.rows.len(), 3);

        assert_eq!(
            parsed.rows[0].row,
            RawRow::Short {
                gene: "CYP2D6".to_string(),
                variant_id: "rs3892097".to_string(),
                description: "Drug metabolism".to_string(),
            }
        );
        assert!(matches!(parsed.rows[1].row, RawRow::Full { .. }));
        assert_eq!(parsed.rows[2].line_number, 3);
        assert_eq!(parsed.rows[2].row.gene(), "BDNF");
    }

    #[test]
    fn test_bad_rows_reported_not_fatal() {
        let tsv = "Neuro\tCOMT\trs4680\tok\n\
                   lonely\n\
                   a\tb\tc\td\te\n\
                   Neuro\t\trs6265\tmissing gene\n\
                   Neuro\tBDNF\trs6265\tok\n";

        let parsed = parse_catalog_text(tsv).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        let rows: Vec<_> = parsed.errors.iter().filter_map(ParseError::row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert!(matches!(
            parsed.errors[2],
            ParseError::EmptyField { field: "gene", .. }
        ));
    }

    #[test]
    fn test_header_comments_and_bom() {
        let tsv = "\u{feff}# curated list\n\
                   \n\
                   Category\tGene\trsID\tDescription\n\
                   Neuro\tCOMT\trs4680\tDopamine\r\n";

        let parsed = parse_catalog_text(tsv).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].line_number, 4);
        assert_eq!(parsed.rows[0].row.variant_id(), "rs4680");
    }

    #[test]
    fn test_cells_trimmed() {
        let parsed = parse_catalog_text("  Neuro \t COMT\trs4680 \t x \n").unwrap();
        assert_eq!(
            parsed.rows[0].row,
            RawRow::Full {
                category: "Neuro".to_string(),
                gene: "COMT".to_string(),
                variant_id: "rs4680".to_string(),
                description: "x".to_string(),
            }
        );
    }
}
