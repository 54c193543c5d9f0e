use crate::cell::CellValue;
use crate::error::{FillError, SourceError};
use crate::tag::qualified_key;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A rectangular block of cell values, row-major, as read from one sheet.
pub type Table = Vec<Vec<CellValue>>;

/// One configured data source: a caller-chosen prefix label and the name of
/// the sheet (or table) it is read from. Tags qualified with `prefix` resolve
/// against this source's cells.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SourceSpec {
    pub prefix: String,
    pub sheet: String,
}

impl SourceSpec {
    pub fn new(prefix: impl Into<String>, sheet: impl Into<String>) -> Self {
        SourceSpec {
            prefix: prefix.into(),
            sheet: sheet.into(),
        }
    }
}

/// A client that can hand out tables by name.
///
/// This is the seam between the resolver and whatever actually holds the
/// data (an uploaded workbook, a CSV file, a remote store). The client is
/// passed in explicitly per request; the resolver holds no global state.
pub trait TableSource {
    fn fetch_table(&mut self, name: &str) -> Result<Table, SourceError>;

    /// Names of all tables the source can offer, in source order. Used for
    /// the automatic sheet-name-as-prefix configuration mode.
    fn sheet_names(&self) -> Vec<String>;
}

/// The resolved key-value association a document is rewritten against.
/// Built once per fill request and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct Mapping {
    entries: HashMap<String, String>,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    /// Insert every cell of a table under a source prefix: each zero-based
    /// (row, col) position becomes `<prefix>:<cellref>` mapped to the cell's
    /// display string. Existing keys are overwritten, so inserting tables in
    /// declaration order yields last-wins conflict resolution.
    pub fn insert_table(&mut self, prefix: &str, table: &Table) {
        for (r_idx, row) in table.iter().enumerate() {
            for (c_idx, value) in row.iter().enumerate() {
                self.insert(qualified_key(prefix, r_idx, c_idx), value.display_string());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Point lookup with a caller-supplied default for missing keys.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Mapping {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Result of a mapping build: the mapping itself plus one warning per source
/// that had to be skipped.
#[derive(Debug)]
pub struct MappingBuild {
    pub mapping: Mapping,
    pub warnings: Vec<String>,
}

/// Build the tag mapping from the configured sources, in declaration order.
///
/// Every cell of every loaded table is inserted as
/// `<prefix>:<cellref> -> display string`, blanks included (a blank cell
/// resolves its tag to the empty string). When two sources define the same
/// qualified key the later declaration wins; conflict resolution follows
/// declaration order even if a caller chooses to fetch concurrently upstream.
///
/// A source that cannot be located or read is skipped with a warning and the
/// build continues. Only the degenerate case where *every* configured source
/// failed aborts, with [`FillError::NoData`].
pub fn build_mapping(
    source: &mut dyn TableSource,
    specs: &[SourceSpec],
) -> Result<MappingBuild, FillError> {
    let mut mapping = Mapping::new();
    let mut warnings = Vec::new();
    let mut loaded = 0usize;

    for spec in specs {
        match source.fetch_table(&spec.sheet) {
            Ok(table) => {
                loaded += 1;
                mapping.insert_table(&spec.prefix, &table);
            }
            Err(e) => {
                let message = format!("skipping source \"{}\": {}", spec.prefix, e);
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }

    if !specs.is_empty() && loaded == 0 {
        return Err(FillError::NoData);
    }

    Ok(MappingBuild { mapping, warnings })
}

/// Parse a caller-supplied JSON configuration object mapping prefix labels to
/// sheet names, e.g. `{"Data": "Sheet1", "Obx": "Rates 2024"}`. Declaration
/// order is preserved.
pub fn specs_from_json(text: &str) -> Result<Vec<SourceSpec>, FillError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| FillError::BadConfig(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| FillError::BadConfig("expected a JSON object of prefix: sheet pairs".to_string()))?;

    let mut specs = Vec::with_capacity(object.len());
    for (prefix, sheet) in object {
        let sheet = sheet.as_str().ok_or_else(|| {
            FillError::BadConfig(format!("sheet name for prefix \"{}\" must be a string", prefix))
        })?;
        specs.push(SourceSpec::new(prefix.clone(), sheet));
    }
    Ok(specs)
}

/// Automatic configuration mode: one spec per sheet of the source, with the
/// sheet's own name as its prefix.
pub fn specs_from_sheets(source: &dyn TableSource) -> Vec<SourceSpec> {
    source
        .sheet_names()
        .into_iter()
        .map(|name| SourceSpec::new(name.clone(), name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory source for tests: a list of named tables, in order.
    pub struct FakeSource {
        tables: Vec<(String, Table)>,
    }

    impl FakeSource {
        pub fn new(tables: Vec<(&str, Table)>) -> Self {
            FakeSource {
                tables: tables
                    .into_iter()
                    .map(|(n, t)| (n.to_string(), t))
                    .collect(),
            }
        }
    }

    impl TableSource for FakeSource {
        fn fetch_table(&mut self, name: &str) -> Result<Table, SourceError> {
            self.tables
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t.clone())
                .ok_or_else(|| SourceError::NotFound(name.to_string()))
        }

        fn sheet_names(&self) -> Vec<String> {
            self.tables.iter().map(|(n, _)| n.clone()).collect()
        }
    }

    fn text_table(rows: &[&[&str]]) -> Table {
        rows.iter()
            .map(|row| row.iter().map(|s| CellValue::Text(s.to_string())).collect())
            .collect()
    }

    #[test]
    fn two_by_two_table_round_trip() {
        let mut source = FakeSource::new(vec![(
            "Sheet1",
            text_table(&[&["x", "y"], &["1", "2"]]),
        )]);
        let build = build_mapping(&mut source, &[SourceSpec::new("S", "Sheet1")]).unwrap();

        assert_eq!(build.mapping.get("S:A1"), Some("x"));
        assert_eq!(build.mapping.get("S:B1"), Some("y"));
        assert_eq!(build.mapping.get("S:A2"), Some("1"));
        assert_eq!(build.mapping.get("S:B2"), Some("2"));
        assert_eq!(build.mapping.len(), 4);
        assert!(build.warnings.is_empty());
    }

    #[test]
    fn later_source_wins_on_key_collision() {
        let mut source = FakeSource::new(vec![
            ("First", text_table(&[&["old"]])),
            ("Second", text_table(&[&["new"]])),
        ]);
        let specs = [
            SourceSpec::new("Data", "First"),
            SourceSpec::new("Data", "Second"),
        ];
        let build = build_mapping(&mut source, &specs).unwrap();
        assert_eq!(build.mapping.get("Data:A1"), Some("new"));
    }

    #[test]
    fn prefixes_are_isolated() {
        let mut source = FakeSource::new(vec![("Sheet1", text_table(&[&["v"]]))]);
        let build = build_mapping(&mut source, &[SourceSpec::new("Obx", "Sheet1")]).unwrap();
        assert_eq!(build.mapping.get("Obx:A1"), Some("v"));
        assert_eq!(build.mapping.get("Data:A1"), None);
    }

    #[test]
    fn missing_source_is_skipped_with_warning() {
        let mut source = FakeSource::new(vec![
            ("Sheet1", text_table(&[&["a"]])),
            ("Sheet3", text_table(&[&["c"]])),
        ]);
        let specs = [
            SourceSpec::new("One", "Sheet1"),
            SourceSpec::new("Two", "NoSuchSheet"),
            SourceSpec::new("Three", "Sheet3"),
        ];
        let build = build_mapping(&mut source, &specs).unwrap();

        assert_eq!(build.mapping.get("One:A1"), Some("a"));
        assert_eq!(build.mapping.get("Three:A1"), Some("c"));
        assert!(!build.mapping.is_empty());
        assert_eq!(build.warnings.len(), 1);
        assert!(build.warnings[0].contains("Two"));
    }

    #[test]
    fn all_sources_failing_aborts_with_no_data() {
        let mut source = FakeSource::new(vec![]);
        let specs = [SourceSpec::new("Data", "Missing")];
        match build_mapping(&mut source, &specs) {
            Err(FillError::NoData) => {}
            other => panic!("expected NoData, got {:?}", other),
        }
    }

    #[test]
    fn empty_spec_list_builds_an_empty_mapping() {
        let mut source = FakeSource::new(vec![]);
        let build = build_mapping(&mut source, &[]).unwrap();
        assert!(build.mapping.is_empty());
    }

    #[test]
    fn blank_cells_resolve_to_empty_strings() {
        let table = vec![vec![CellValue::Blank, CellValue::Text("x".to_string())]];
        let mut source = FakeSource::new(vec![("Sheet1", table)]);
        let build = build_mapping(&mut source, &[SourceSpec::new("S", "Sheet1")]).unwrap();
        assert_eq!(build.mapping.get("S:A1"), Some(""));
        assert_eq!(build.mapping.get("S:B1"), Some("x"));
    }

    #[test]
    fn mapping_lookup_with_default() {
        let mapping: Mapping =
            [("Data:A1".to_string(), "Alice".to_string())].into_iter().collect();
        assert_eq!(mapping.get_or("Data:A1", "?"), "Alice");
        assert_eq!(mapping.get_or("Data:Z9", "?"), "?");
    }

    #[test]
    fn json_specs_preserve_declaration_order() {
        let specs = specs_from_json(r#"{"Data": "Sheet1", "Obx": "Rates 2024"}"#).unwrap();
        assert_eq!(
            specs,
            vec![
                SourceSpec::new("Data", "Sheet1"),
                SourceSpec::new("Obx", "Rates 2024"),
            ]
        );
    }

    #[test]
    fn malformed_json_config_is_rejected() {
        assert!(matches!(
            specs_from_json("{not json"),
            Err(FillError::BadConfig(_))
        ));
        assert!(matches!(
            specs_from_json(r#"["Data"]"#),
            Err(FillError::BadConfig(_))
        ));
        assert!(matches!(
            specs_from_json(r#"{"Data": 5}"#),
            Err(FillError::BadConfig(_))
        ));
    }

    #[test]
    fn sheet_names_become_prefixes_in_automatic_mode() {
        let source = FakeSource::new(vec![
            ("Sheet1", text_table(&[&["a"]])),
            ("Rates", text_table(&[&["b"]])),
        ]);
        let specs = specs_from_sheets(&source);
        assert_eq!(
            specs,
            vec![
                SourceSpec::new("Sheet1", "Sheet1"),
                SourceSpec::new("Rates", "Rates"),
            ]
        );
    }
}
