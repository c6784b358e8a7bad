//! Tabular payloads as returned by the statistics API.
//!
//! Every endpoint answers with one or more result sets of the form
//! `{"name": ..., "headers": [...], "rowSet": [[...], ...]}`. A [`Table`]
//! keeps that shape: named columns and rows of JSON scalars.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use nbaflow_core::{FetchError, FetchResult};

/// Column-level problems when combining or reshaping tables.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("column mismatch: expected {expected:?}, found {found:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("missing column: {0}")]
    MissingColumn(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build from one `resultSets` entry.
    pub fn from_result_set(set: &Value) -> FetchResult<Self> {
        let columns = set
            .get("headers")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::decode("result set without headers"))?
            .iter()
            .map(|h| {
                h.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| FetchError::decode("non-string header"))
            })
            .collect::<FetchResult<Vec<_>>>()?;

        let rows = set
            .get("rowSet")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::decode("result set without rowSet"))?
            .iter()
            .map(|row| match row.as_array() {
                Some(cells) if cells.len() == columns.len() => Ok(cells.clone()),
                Some(cells) => Err(FetchError::decode(format!(
                    "row has {} cells, expected {}",
                    cells.len(),
                    columns.len()
                ))),
                None => Err(FetchError::decode("row is not an array")),
            })
            .collect::<FetchResult<Vec<_>>>()?;

        Ok(Self { columns, rows })
    }

    /// Pick the result set called `name` out of a full endpoint response.
    pub fn from_response(response: &Value, name: &str) -> FetchResult<Self> {
        let sets = response
            .get("resultSets")
            .or_else(|| response.get("resultSet"))
            .ok_or_else(|| FetchError::decode("response without resultSets"))?;

        let set = match sets {
            Value::Array(sets) => sets
                .iter()
                .find(|s| s.get("name").and_then(Value::as_str) == Some(name)),
            single @ Value::Object(_) => Some(single),
            _ => None,
        }
        .ok_or_else(|| FetchError::decode(format!("result set {name} not found")))?;

        Self::from_result_set(set)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Value of `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column).ok()?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::ColumnMismatch {
                expected: self.columns.clone(),
                found: vec![format!("{} cells", row.len())],
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Lower-case and trim every column name.
    pub fn lowercase_columns(&mut self) {
        for column in &mut self.columns {
            *column = column.trim().to_lowercase();
        }
    }

    /// Add a column holding the same value on every row.
    pub fn push_constant_column(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }

    /// Rewrite every cell of `column`.
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> Result<(), TableError>
    where
        F: FnMut(&Value) -> Value,
    {
        let idx = self.column_index(column)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    /// Keep only rows whose `column` satisfies `keep`.
    pub fn retain_rows<F>(&mut self, column: &str, mut keep: F) -> Result<(), TableError>
    where
        F: FnMut(&Value) -> bool,
    {
        let idx = self.column_index(column)?;
        self.rows.retain(|row| keep(&row[idx]));
        Ok(())
    }

    /// Stable sort, largest first. Numbers compare numerically, everything
    /// else by its text; nulls go last.
    pub fn sort_by_desc(&mut self, column: &str) -> Result<(), TableError> {
        let idx = self.column_index(column)?;
        self.rows.sort_by(|a, b| compare_cells(&b[idx], &a[idx]));
        Ok(())
    }

    /// Whether `other` can be appended: same columns, or either side is a
    /// blank table.
    pub fn accepts(&self, other: &Table) -> bool {
        self.is_blank() || other.is_blank() || self.columns == other.columns
    }

    fn is_blank(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// Append the rows of `other`. An empty, column-less table adopts the
    /// columns of the first table appended to it.
    pub fn append(&mut self, other: Table) -> Result<(), TableError> {
        if !self.accepts(&other) {
            return Err(TableError::ColumnMismatch {
                expected: self.columns.clone(),
                found: other.columns,
            });
        }
        self.absorb(other);
        Ok(())
    }

    fn absorb(&mut self, other: Table) {
        if self.is_blank() {
            *self = other;
        } else if !other.is_blank() {
            self.rows.extend(other.rows);
        }
    }

    /// Append every table whose columns agree with the first non-blank one.
    /// The others are handed back untouched, with the mismatch that
    /// kept them out.
    pub fn merge<I>(tables: I) -> (Table, Vec<RejectedTable>)
    where
        I: IntoIterator<Item = Table>,
    {
        let mut out = Table::default();
        let mut rejected = Vec::new();
        for table in tables {
            if out.accepts(&table) {
                out.absorb(table);
                continue;
            }
            let error = TableError::ColumnMismatch {
                expected: out.columns.clone(),
                found: table.columns.clone(),
            };
            rejected.push(RejectedTable { table, error });
        }
        (out, rejected)
    }
}

/// A table left out of a [`Table::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedTable {
    pub table: Table,
    pub error: TableError,
}

/// Text form of a cell as written to flat files.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        _ => cell_text(a).cmp(&cell_text(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> Value {
        json!({
            "resource": "playergamelog",
            "resultSets": [
                {
                    "name": "PlayerGameLog",
                    "headers": ["Game_ID", "GAME_DATE", " PTS "],
                    "rowSet": [
                        ["0022000001", "DEC 22, 2020", 27],
                        ["0022000002", "DEC 25, 2020", 33],
                        ["0022000003", "DEC 23, 2020", 18]
                    ]
                },
                {
                    "name": "Other",
                    "headers": ["X"],
                    "rowSet": []
                }
            ]
        })
    }

    #[test]
    fn picks_named_result_set() {
        let table = Table::from_response(&response(), "PlayerGameLog").unwrap();
        assert_eq!(table.columns(), ["Game_ID", "GAME_DATE", " PTS "]);
        assert_eq!(table.len(), 3);

        let other = Table::from_response(&response(), "Other").unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn missing_result_set_is_a_decode_error() {
        let err = Table::from_response(&response(), "CommonPlayerInfo").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(!err.is_timeout());

        let err = Table::from_response(&json!({"message": "nope"}), "Any").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let set = json!({"headers": ["A", "B"], "rowSet": [[1, 2], [3]]});
        assert!(Table::from_result_set(&set).is_err());
    }

    #[test]
    fn lowercases_and_trims_columns() {
        let mut table = Table::from_response(&response(), "PlayerGameLog").unwrap();
        table.lowercase_columns();
        assert_eq!(table.columns(), ["game_id", "game_date", "pts"]);
    }

    #[test]
    fn constant_columns_fill_every_row() {
        let mut table = Table::from_response(&response(), "PlayerGameLog").unwrap();
        table.push_constant_column("SEASON", json!("2020-21"));
        assert_eq!(table.value(2, "SEASON"), Some(&json!("2020-21")));
    }

    #[test]
    fn sorts_numbers_descending() {
        let mut table = Table::from_response(&response(), "PlayerGameLog").unwrap();
        table.sort_by_desc(" PTS ").unwrap();
        let pts: Vec<_> = (0..3).map(|i| table.value(i, " PTS ").cloned().unwrap()).collect();
        assert_eq!(pts, vec![json!(33), json!(27), json!(18)]);
        assert_eq!(
            table.sort_by_desc("missing"),
            Err(TableError::MissingColumn("missing".into()))
        );
    }

    #[test]
    fn retain_filters_rows() {
        let mut table = Table::from_response(&response(), "PlayerGameLog").unwrap();
        table
            .retain_rows(" PTS ", |v| v.as_i64().unwrap_or(0) >= 20)
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn append_requires_matching_columns() {
        let mut a = Table::from_response(&response(), "PlayerGameLog").unwrap();
        a.append(a.clone()).unwrap();
        assert_eq!(a.len(), 6);

        let other = Table::new(vec!["X".into()]);
        assert!(matches!(
            a.append(other),
            Err(TableError::ColumnMismatch { .. })
        ));
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn merge_sets_aside_mismatched_tables() {
        let a = Table::from_response(&response(), "PlayerGameLog").unwrap();
        let mut odd = Table::new(vec!["X".into()]);
        odd.push_row(vec![json!(1)]).unwrap();

        let (merged, rejected) = Table::merge(vec![a.clone(), odd.clone(), a.clone()]);

        assert_eq!(merged.len(), 6);
        assert_eq!(merged.columns(), a.columns());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].table, odd);
        assert_eq!(
            rejected[0].error,
            TableError::ColumnMismatch {
                expected: a.columns().to_vec(),
                found: vec!["X".into()],
            }
        );
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let (table, rejected) = Table::merge(Vec::new());
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert!(rejected.is_empty());
    }

    #[test]
    fn cell_text_renders_scalars() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!("LAL")), "LAL");
        assert_eq!(cell_text(&json!(12.5)), "12.5");
        assert_eq!(cell_text(&json!(true)), "true");
    }
}
