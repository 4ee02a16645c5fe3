//! Column-oriented table

use super::column::Column;
use sdk::StepError;
use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    height: usize,
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    /// Build a table from named columns of equal length
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self, StepError> {
        let height = columns.first().map_or(0, |(_, c)| c.len());
        let mut table = Self {
            height,
            ..Self::default()
        };
        for (name, column) in columns {
            if table.contains(&name) {
                return Err(StepError::Failed(format!("duplicate column '{}'", name)));
            }
            table.set_column(name, column)?;
        }
        Ok(table)
    }

    /// Table with `height` rows and no columns yet
    pub fn with_height(height: usize) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Row count; survives dropping every column
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Replace a column in place, or append it
    pub fn set_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), StepError> {
        if column.len() != self.height {
            return Err(StepError::Failed(format!(
                "column length {} does not match table height {}",
                column.len(),
                self.height
            )));
        }

        let name = name.into();
        match self.names.iter().position(|n| *n == name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Remove a column, returning whether it existed
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.names.iter().position(|n| n == name) {
            Some(i) => {
                self.names.remove(i);
                self.columns.remove(i);
                true
            }
            None => false,
        }
    }

    /// Keep rows where `keep` is true
    pub fn retain_rows(&mut self, keep: &[bool]) {
        let indices: Vec<usize> = (0..self.height).filter(|&i| keep[i]).collect();
        self.take_rows(&indices);
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Table {
        let mut head = self.clone();
        let indices: Vec<usize> = (0..self.height.min(n)).collect();
        head.take_rows(&indices);
        head
    }

    fn take_rows(&mut self, indices: &[usize]) {
        for column in &mut self.columns {
            *column = column.take(indices);
        }
        self.height = indices.len();
    }

    /// Fraction of rows with at least one null; `None` for an empty table
    pub fn null_row_fraction(&self) -> Option<f64> {
        if self.height == 0 {
            return None;
        }
        let with_null = (0..self.height)
            .filter(|&row| self.columns.iter().any(|c| c.is_null(row)))
            .count();
        Some(with_null as f64 / self.height as f64)
    }

    /// Column-to-values view of the first `rows` rows
    pub fn preview(&self, rows: usize) -> TablePreview {
        let head = self.head(rows);
        let columns = head
            .iter()
            .map(|(name, column)| {
                let values = (0..head.height).map(|i| column.cell_json(i)).collect();
                (name.to_string(), values)
            })
            .collect();
        TablePreview { columns }
    }
}

/// Ordered `{column: [values]}` snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablePreview {
    pub columns: Vec<(String, Vec<serde_json::Value>)>,
}

impl Serialize for TablePreview {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, values) in &self.columns {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            ("id".to_string(), Column::Int(vec![Some(1), Some(2), Some(3)])),
            (
                "score".to_string(),
                Column::Float(vec![Some(0.5), None, Some(1.5)]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_height_survives_dropping_all_columns() {
        let mut table = sample();
        assert!(table.drop_column("id"));
        assert!(table.drop_column("score"));
        assert!(!table.drop_column("score"));
        assert_eq!(table.width(), 0);
        assert_eq!(table.height(), 3);
    }

    #[test]
    fn test_set_column_rejects_length_mismatch() {
        let mut table = sample();
        let err = table.set_column("x", Column::Int(vec![Some(1)])).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_retain_rows_and_null_fraction() {
        let mut table = sample();
        assert_eq!(table.null_row_fraction(), Some(1.0 / 3.0));

        table.retain_rows(&[true, false, true]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.null_row_fraction(), Some(0.0));
    }

    #[test]
    fn test_preview_keeps_column_order() {
        let table = sample();
        let json = serde_json::to_string(&table.preview(2)).unwrap();
        assert_eq!(json, r#"{"id":[1,2],"score":[0.5,null]}"#);
    }
}
