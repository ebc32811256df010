//! Table interop: Polars DataFrame conversion plus CSV and Parquet output.

use std::fs;
use std::path::Path;

use polars::prelude::*;

use super::table::{ColumnData, Table};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("polars: {0}")]
    Polars(#[from] PolarsError),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported output extension '{0}' (expected .csv or .parquet)")]
    UnsupportedFormat(String),
}

impl Table {
    /// Convert to a Polars DataFrame.
    ///
    /// `timestamp` becomes a millisecond Datetime column; signal columns are
    /// written as their `BUY` / `SELL` / `HOLD` labels.
    pub fn to_dataframe(&self) -> Result<DataFrame, ExportError> {
        let millis: Vec<i64> = self
            .timestamps()
            .iter()
            .map(|ts| ts.and_utc().timestamp_millis())
            .collect();

        let mut columns = Vec::with_capacity(self.columns().len() + 1);
        columns.push(
            Column::new("timestamp".into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        );

        for (name, data) in self.columns() {
            let column = match data {
                ColumnData::Numeric(values) => Column::new(name.as_str().into(), values.clone()),
                ColumnData::Signals(values) => {
                    let labels: Vec<&str> = values.iter().map(|s| s.as_str()).collect();
                    Column::new(name.as_str().into(), labels)
                }
            };
            columns.push(column);
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv(&self, path: &Path) -> Result<(), ExportError> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["timestamp".to_string()];
        header.extend(self.columns().iter().map(|(name, _)| name.clone()));
        writer.write_record(&header)?;

        for (i, ts) in self.timestamps().iter().enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(ts.format("%Y-%m-%d %H:%M:%S").to_string());
            for (_, data) in self.columns() {
                record.push(match data {
                    ColumnData::Numeric(values) if values[i].is_nan() => String::new(),
                    ColumnData::Numeric(values) => values[i].to_string(),
                    ColumnData::Signals(values) => values[i].to_string(),
                });
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write the table as a Parquet file.
    pub fn write_parquet(&self, path: &Path) -> Result<(), ExportError> {
        let mut df = self.to_dataframe()?;
        let file = fs::File::create(path)?;
        ParquetWriter::new(file).finish(&mut df)?;
        Ok(())
    }

    /// Write to `path`, choosing the format from its extension.
    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => self.write_csv(path),
            Some("parquet") => self.write_parquet(path),
            other => Err(ExportError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, Signal};
    use chrono::NaiveDate;

    fn table() -> Table {
        let base = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let candles = (0..3).map(|i| {
            Candle::unadjusted(
                base + chrono::Duration::days(i),
                10.0,
                11.0,
                9.0,
                10.0 + i as f64,
                500.0,
            )
        });
        let mut t = Table::from_candles("TEST", candles);
        t.set_numeric("ma_2", vec![f64::NAN, 10.5, 11.5]).unwrap();
        t.set_signals("ma_cross_1", vec![Signal::Hold, Signal::Buy, Signal::Hold])
            .unwrap();
        t
    }

    #[test]
    fn dataframe_has_all_columns() {
        let df = table().to_dataframe().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 1 + 6 + 2);
        assert!(df.column("ma_cross_1").is_ok());
        assert!(matches!(
            df.column("timestamp").unwrap().dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, None)
        ));
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        table().write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,open,high,low,close,adj_close,volume,ma_2,ma_cross_1"
        );
        let second = lines.nth(1).unwrap();
        assert!(second.ends_with(",10.5,BUY"), "got {second}");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = table().write_to(Path::new("out.xlsx")).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(ext) if ext == "xlsx"));
    }
}
