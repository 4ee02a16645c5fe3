//! Tabular profiler

use super::stats::{mean, min_max, non_null};
use super::table::Table;
use sdk::{ColumnProfile, NumericStats, TabularProfile};

const SAMPLE_VALUES: usize = 5;

/// Profile the first `sample_rows` rows of a raw table
pub fn profile_table(table: &Table, sample_rows: usize) -> TabularProfile {
    let sample = table.head(sample_rows);
    let rows = sample.height();

    let columns = sample
        .iter()
        .map(|(name, column)| {
            let stats = if column.is_numeric() {
                let present = non_null(&column.to_numeric());
                match (min_max(&present), mean(&present)) {
                    (Some((min, max)), Some(mean)) => Some(NumericStats { min, max, mean }),
                    _ => None,
                }
            } else {
                None
            };

            ColumnProfile {
                name: name.to_string(),
                dtype: column.dtype().to_string(),
                null_pct: if rows == 0 {
                    0.0
                } else {
                    column.null_count() as f64 / rows as f64
                },
                nunique: column.nunique(),
                stats,
                sample: column.sample(SAMPLE_VALUES),
            }
        })
        .collect();

    TabularProfile {
        rows_sampled: rows,
        null_row_pct_overall: sample.null_row_fraction(),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::csv_io::read_csv_from;

    #[test]
    fn test_profile_columns() {
        let table = read_csv_from("id,price,city\n1,10.0,Oslo\n2,,Rome\n3,30.0,Oslo\n".as_bytes())
            .unwrap();
        let profile = profile_table(&table, 5000);

        assert_eq!(profile.rows_sampled, 3);
        assert_eq!(profile.null_row_pct_overall, Some(1.0 / 3.0));

        let price = profile.column("price").unwrap();
        assert_eq!(price.dtype, "float64");
        assert!((price.null_pct - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(price.stats.unwrap().mean, 20.0);
        assert_eq!(price.sample, vec!["10.0", "30.0"]);

        let city = profile.column("city").unwrap();
        assert!(!city.is_numeric());
        assert_eq!(city.nunique, 2);
    }

    #[test]
    fn test_profile_respects_sample_rows() {
        let table = read_csv_from("x\n1\n2\n3\n4\n".as_bytes()).unwrap();
        let profile = profile_table(&table, 2);

        assert_eq!(profile.rows_sampled, 2);
        assert_eq!(profile.columns[0].stats.unwrap().max, 2.0);
    }
}
