//! Input file loading.
//!
//! Return files are CSV with a `date` column followed by one column per
//! asset:
//!
//! ```text
//! date,TCS,RIL,INFY
//! 2024-01-02,0.0123,-0.0040,0.0051
//! 2024-01-03,-0.0071,0.0102,0.0009
//! ```

use chrono::NaiveDate;
use folio_core::types::{AssetMap, ReturnMatrix};
use std::io::Read;
use std::path::Path;

use crate::{CliError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn invalid(file: &str, message: impl Into<String>) -> CliError {
    CliError::InvalidData {
        file: file.to_string(),
        message: message.into(),
    }
}

/// Reads a return matrix from CSV text. `source` names the input in errors.
pub fn read_returns<R: Read>(reader: R, source: &str) -> Result<ReturnMatrix> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers()?.clone();
    match headers.get(0) {
        Some(h) if h.eq_ignore_ascii_case("date") => {}
        _ => return Err(invalid(source, "first column must be 'date'")),
    }
    let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    if assets.is_empty() {
        return Err(invalid(source, "no asset columns"));
    }

    let mut dates = Vec::new();
    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|e| {
            invalid(source, format!("row {}: bad date '{}': {}", line + 1, raw_date, e))
        })?;
        // Empty cells become NaN and are rejected by the matrix as missing.
        let row = record
            .iter()
            .skip(1)
            .map(|cell| {
                if cell.is_empty() {
                    Ok(f64::NAN)
                } else {
                    cell.parse::<f64>().map_err(|_| {
                        invalid(source, format!("row {}: '{}' is not a number", line + 1, cell))
                    })
                }
            })
            .collect::<Result<Vec<f64>>>()?;
        dates.push(date);
        rows.push(row);
    }

    Ok(ReturnMatrix::from_rows(dates, assets, rows)?)
}

/// Loads a return matrix from a CSV file.
pub fn load_returns(path: &Path) -> Result<ReturnMatrix> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    let file = std::fs::File::open(path)?;
    read_returns(file, &path.display().to_string())
}

/// Loads a single-column benchmark series aligned with `dates`.
pub fn load_benchmark(path: &Path, dates: &[NaiveDate]) -> Result<Vec<f64>> {
    let matrix = load_returns(path)?;
    let source = path.display().to_string();
    if matrix.n_assets() != 1 {
        return Err(invalid(
            &source,
            format!("expected one benchmark column, found {}", matrix.n_assets()),
        ));
    }
    if matrix.dates() != dates {
        return Err(invalid(&source, "benchmark dates differ from the return file"));
    }
    Ok(matrix.column(0).to_vec())
}

/// Parses `ASSET=VALUE` pairs into an asset map.
pub fn parse_assignments(pairs: &[String]) -> Result<AssetMap> {
    pairs
        .iter()
        .map(|pair| {
            let (asset, value) = pair.split_once('=').ok_or_else(|| {
                CliError::InvalidArgument(format!("'{}' is not ASSET=VALUE", pair))
            })?;
            let value = value.trim().parse::<f64>().map_err(|_| {
                CliError::InvalidArgument(format!("'{}' has a non-numeric value", pair))
            })?;
            Ok((asset.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "date,A,B\n2024-01-01,0.01,0.02\n2024-01-02,-0.02,-0.01\n2024-01-03,0.03,-0.01\n";

    #[test]
    fn test_read_returns() {
        let matrix = read_returns(SAMPLE.as_bytes(), "sample").unwrap();
        assert_eq!(matrix.assets(), &["A".to_string(), "B".to_string()]);
        assert_eq!(matrix.n_periods(), 3);
        assert_eq!(matrix.column_by_name("B").unwrap()[1], -0.01);
    }

    #[test]
    fn test_missing_cell_rejected() {
        let text = "date,A,B\n2024-01-01,0.01,\n2024-01-02,0.02,0.01\n";
        assert!(matches!(
            read_returns(text.as_bytes(), "gap"),
            Err(CliError::Engine(_))
        ));
    }

    #[test]
    fn test_bad_header_and_date() {
        assert!(read_returns("day,A\n2024-01-01,0.1\n".as_bytes(), "x").is_err());
        assert!(read_returns("date,A\n01/02/2024,0.1\n".as_bytes(), "x").is_err());
        assert!(read_returns("date,A\n2024-01-01,abc\n".as_bytes(), "x").is_err());
    }

    #[test]
    fn test_parse_assignments() {
        let map = parse_assignments(&["TCS=0.12".to_string(), " GOLD = 0.05".to_string()]).unwrap();
        assert_eq!(map["TCS"], 0.12);
        assert_eq!(map["GOLD"], 0.05);
        assert!(parse_assignments(&["TCS".to_string()]).is_err());
        assert!(parse_assignments(&["TCS=x".to_string()]).is_err());
    }
}
