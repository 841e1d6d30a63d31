//! Taxa table adapter: reads the classifier's taxonomy export into
//! [`TaxonRecord`]s, in file order.
//!
//! Two formats are accepted, picked by file extension:
//!
//! - `.csv` with a header row. Columns are located by name; unknown columns
//!   are ignored and empty cells are absent values.
//! - `.json` holding an array of objects with the same keys.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use rollup_core::{RankLevel, RollupError, TaxonId, TaxonRecord, Taxonomy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod diff;
pub mod summary;

pub use diff::TaxaDiff;
pub use summary::TaxaSummary;

pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("taxa table has no `{0}` column")]
    MissingColumn(&'static str),

    #[error("unsupported taxa table format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error(transparent)]
    Taxonomy(#[from] RollupError),
}

/// One row as it appears in the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxaRow {
    #[serde(default)]
    pub parent_taxon_id: Option<TaxonId>,
    pub taxon_id: TaxonId,
    pub rank_level: f32,
    #[serde(default)]
    pub leaf_class_id: Option<usize>,
    #[serde(default)]
    pub iconic_class_id: Option<u32>,
    #[serde(default)]
    pub geo_threshold: Option<f32>,
    #[serde(default)]
    pub name: String,
}

impl From<TaxaRow> for TaxonRecord {
    fn from(row: TaxaRow) -> Self {
        TaxonRecord {
            id: row.taxon_id,
            name: row.name,
            rank: RankLevel(row.rank_level),
            leaf_index: row.leaf_class_id,
            parent_id: row.parent_taxon_id,
            iconic_group_id: row.iconic_class_id,
            geo_threshold: row.geo_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
}

impl TableFormat {
    pub fn detect(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            _ => Err(TableError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

// ── Readers ───────────────────────────────────────────────────────────────────

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<TaxonRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    if !rdr.headers()?.iter().any(|h| h == "taxon_id") {
        return Err(TableError::MissingColumn("taxon_id"));
    }
    rdr.deserialize::<TaxaRow>()
        .map(|row| -> Result<TaxonRecord> { Ok(row?.into()) })
        .collect()
}

pub fn read_json<R: Read>(reader: R) -> Result<Vec<TaxonRecord>> {
    let rows: Vec<TaxaRow> = serde_json::from_reader(reader)?;
    Ok(rows.into_iter().map(TaxonRecord::from).collect())
}

/// Read every record of the table at `path`, format by extension.
pub fn load_records(path: &Path) -> Result<Vec<TaxonRecord>> {
    let format = TableFormat::detect(path)?;
    let file = File::open(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    match format {
        TableFormat::Csv => read_csv(reader),
        TableFormat::Json => read_json(reader),
    }
}

/// Read the table at `path` and build the tree from it.
pub fn load_taxonomy(path: &Path) -> Result<Taxonomy> {
    Ok(Taxonomy::build(load_records(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
parent_taxon_id,taxon_id,rank_level,leaf_class_id,iconic_class_id,spatial_class_id,name
,48460,100,,,,Life
48460,1,70,,,,Animalia
1,47125,20,,1,,Genus
47125,3,10,0,1,7,Species one
47125,4,10,1,1,8,Species two
";

    #[test]
    fn csv_columns_are_found_by_name() {
        let records = read_csv(CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].parent_id, None);
        assert_eq!(records[0].leaf_index, None);
        assert_eq!(records[3].leaf_index, Some(0));
        assert_eq!(records[3].iconic_group_id, Some(1));
        assert_eq!(records[4].name, "Species two");
        assert_eq!(records[4].rank, RankLevel::SPECIES);
    }

    #[test]
    fn csv_column_order_does_not_matter() {
        let csv = "name,rank_level,taxon_id,parent_taxon_id,leaf_class_id,geo_threshold\n\
                   Root,100,1,,,\n\
                   Leaf,10,2,1,0,0.25\n";
        let records = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[1].parent_id, Some(1));
        assert_eq!(records[1].geo_threshold, Some(0.25));
        assert!(Taxonomy::build(records).is_ok());
    }

    #[test]
    fn fractional_rank_levels_survive() {
        let csv = "taxon_id,rank_level,name\n7,34.5,Parvorder\n";
        let records = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[0].rank.name(), Some("parvorder"));
    }

    #[test]
    fn missing_taxon_id_column_is_reported() {
        let csv = "id,rank_level\n1,10\n";
        assert!(matches!(
            read_csv(csv.as_bytes()),
            Err(TableError::MissingColumn("taxon_id"))
        ));
    }

    #[test]
    fn bad_cell_is_a_csv_error() {
        let csv = "taxon_id,rank_level\nabc,10\n";
        assert!(matches!(read_csv(csv.as_bytes()), Err(TableError::Csv(_))));
    }

    #[test]
    fn json_rows_use_null_for_absent_values() {
        let json = r#"[
            {"parent_taxon_id": null, "taxon_id": 1, "rank_level": 100, "name": "Life"},
            {"parent_taxon_id": 1, "taxon_id": 2, "rank_level": 10, "leaf_class_id": 0,
             "geo_threshold": 0.1, "name": "Only"}
        ]"#;
        let records = read_json(json.as_bytes()).unwrap();
        assert_eq!(records[0].parent_id, None);
        assert_eq!(records[1].leaf_index, Some(0));
        let tree = Taxonomy::build(records).unwrap();
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(TableFormat::detect(Path::new("taxonomy.csv")).unwrap(), TableFormat::Csv);
        assert_eq!(TableFormat::detect(Path::new("a/b/taxa.JSON")).unwrap(), TableFormat::Json);
        assert!(matches!(
            TableFormat::detect(Path::new("taxonomy.tsv")),
            Err(TableError::UnsupportedFormat(_))
        ));
        assert!(TableFormat::detect(Path::new("taxonomy")).is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_records(Path::new("/nonexistent/taxonomy.csv")).unwrap_err();
        assert!(matches!(err, TableError::Io { .. }));
    }
}
