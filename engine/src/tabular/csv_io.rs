//! CSV reading and writing
//!
//! Reading infers one type per column, trying int, float, bool and finally
//! string. Cells matching the usual NA spellings are null. A column of ints
//! with any null is read as float, and a bool column with any null as string.

use super::column::{format_datetime, Column};
use super::table::Table;
use chrono::Timelike;
use sdk::PipelineError;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_VALUES: &[&str] = &["True", "TRUE", "true"];
const FALSE_VALUES: &[&str] = &["False", "FALSE", "false"];

fn is_na(cell: &str) -> bool {
    NA_VALUES.contains(&cell)
}

pub fn read_csv(path: &Path) -> Result<Table, PipelineError> {
    let file = std::fs::File::open(path)
        .map_err(|e| PipelineError::Input(format!("failed to open {}: {}", path.display(), e)))?;
    let table = read_csv_from(file)
        .map_err(|e| PipelineError::Input(format!("{}: {}", path.display(), e)))?;
    debug!(
        "Read {} rows x {} cols from {}",
        table.height(),
        table.width(),
        path.display()
    );
    Ok(table)
}

/// Parse CSV from any reader; the error is a human readable reason
pub fn read_csv_from<R: Read>(reader: R) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    if headers.is_empty() {
        return Err("no columns to parse".to_string());
    }
    let names = dedupe_headers(headers.iter());

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() > names.len() {
            return Err(format!(
                "expected {} fields in row {}, saw {}",
                names.len(),
                line + 1,
                record.len()
            ));
        }
        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record.get(i).filter(|c| !is_na(c)).map(str::to_string);
            column.push(cell);
        }
    }

    let height = cells.first().map_or(0, Vec::len);
    let mut table = Table::with_height(height);
    for (name, raw) in names.into_iter().zip(cells) {
        table
            .set_column(name, infer_column(raw))
            .map_err(|e| e.to_string())?;
    }
    Ok(table)
}

/// Repeated headers get `.1`, `.2` suffixes; blank headers are `Unnamed: i`
fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for (i, header) in headers.enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header.to_string()
        };
        let mut name = base.clone();
        let mut n = 1;
        while !seen.insert(name.clone()) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        names.push(name);
    }
    names
}

fn infer_column(raw: Vec<Option<String>>) -> Column {
    if raw.is_empty() {
        return Column::Str(raw);
    }

    let present: Vec<&str> = raw.iter().flatten().map(String::as_str).collect();
    let has_null = present.len() < raw.len();

    // All-null columns read as float
    if present.is_empty() {
        return Column::Float(vec![None; raw.len()]);
    }

    if !has_null && present.iter().all(|c| c.trim().parse::<i64>().is_ok()) {
        return Column::Int(
            raw.iter()
                .map(|c| c.as_deref().and_then(|s| s.trim().parse().ok()))
                .collect(),
        );
    }

    if present.iter().all(|c| c.trim().parse::<f64>().is_ok()) {
        return Column::float(
            raw.iter()
                .map(|c| c.as_deref().and_then(|s| s.trim().parse().ok()))
                .collect(),
        );
    }

    let is_bool = |c: &&str| TRUE_VALUES.contains(c) || FALSE_VALUES.contains(c);
    if !has_null && present.iter().all(is_bool) {
        return Column::Bool(
            raw.iter()
                .map(|c| c.as_deref().map(|s| TRUE_VALUES.contains(&s)))
                .collect(),
        );
    }

    Column::Str(raw)
}

pub fn write_csv(table: &Table, path: &Path) -> Result<(), PipelineError> {
    let file = std::fs::File::create(path).map_err(|e| {
        PipelineError::Output(format!("failed to create {}: {}", path.display(), e))
    })?;
    write_csv_to(table, file)
}

pub fn write_csv_to<W: Write>(table: &Table, writer: W) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_writer(writer);
    let to_output = |e: csv::Error| PipelineError::Output(e.to_string());

    writer.write_record(table.names()).map_err(to_output)?;

    let rendered: Vec<Vec<String>> = table.iter().map(|(_, c)| render_for_csv(c)).collect();
    for row in 0..table.height() {
        writer
            .write_record(rendered.iter().map(|column| column[row].as_str()))
            .map_err(to_output)?;
    }
    writer
        .flush()
        .map_err(|e| PipelineError::Output(e.to_string()))
}

/// CSV document as a string
pub fn to_csv_string(table: &Table) -> Result<String, PipelineError> {
    let mut buffer = Vec::new();
    write_csv_to(table, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| PipelineError::Output(e.to_string()))
}

fn render_for_csv(column: &Column) -> Vec<String> {
    if let Column::DateTime(values) = column {
        // Date-only output when no value carries a time of day
        let date_only = values
            .iter()
            .flatten()
            .all(|d| d.num_seconds_from_midnight() == 0 && d.nanosecond() == 0);
        return values
            .iter()
            .map(|v| match v {
                Some(d) if date_only => d.format("%Y-%m-%d").to_string(),
                Some(d) => format_datetime(*d),
                None => String::new(),
            })
            .collect();
    }

    (0..column.len())
        .map(|i| column.render(i).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> Table {
        read_csv_from(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_type_inference() {
        let table = parse("a,b,c,d,e\n1,1.5,True,x,\n2,NA,False,y,\n");

        assert_eq!(table.column("a").unwrap().dtype(), "int64");
        assert_eq!(table.column("b").unwrap().dtype(), "float64");
        assert_eq!(table.column("c").unwrap().dtype(), "bool");
        assert_eq!(table.column("d").unwrap().dtype(), "object");
        assert_eq!(table.column("e").unwrap().dtype(), "float64");
        assert_eq!(table.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_ints_with_nulls_read_as_float() {
        let table = parse("n,m\n1,a\n,b\n3,c\n");
        assert_eq!(
            table.column("n").unwrap(),
            &Column::Float(vec![Some(1.0), None, Some(3.0)])
        );
    }

    #[test]
    fn test_duplicate_headers_are_renamed() {
        let table = parse("a,a,\n1,2,3\n");
        assert_eq!(table.names(), &["a", "a.1", "Unnamed: 2"]);
    }

    #[test]
    fn test_short_rows_pad_with_null() {
        let table = parse("a,b\n1,2\n3\n");
        assert_eq!(table.height(), 2);
        assert_eq!(table.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let err = read_csv_from("a,b\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(err.contains("expected 2 fields"));
    }

    #[test]
    fn test_write_round_trips_rendering() {
        let mut table = parse("id,price,when\n1,2.0,2024-01-02\n2,,2024-01-03\n");
        let dates = table.column("when").unwrap().to_datetimes();
        table.set_column("when", Column::DateTime(dates)).unwrap();

        let csv = to_csv_string(&table).unwrap();
        assert_eq!(csv, "id,price,when\n1,2.0,2024-01-02\n2,,2024-01-03\n");
    }
}
