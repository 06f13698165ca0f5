use std::fs::{self, File};
use std::path::Path;

use polars::prelude::*;

use crate::error::IamError;
use crate::frame::IamFrame;
use crate::schema::data;

/// Read a `.csv` (all columns as String) or `.parquet` file.
/// Trims whitespace from column names.
pub fn read_frame(path: impl AsRef<Path>) -> Result<DataFrame, IamError> {
    read_with_schema_length(path.as_ref(), Some(0))
}

/// Read a metadata table, inferring column dtypes from CSV content so that
/// numeric cells such as `2040.0` arrive as numbers rather than strings.
pub fn read_meta(path: impl AsRef<Path>) -> Result<DataFrame, IamError> {
    read_with_schema_length(path.as_ref(), Some(INFER_SCHEMA_ROWS))
}

const INFER_SCHEMA_ROWS: usize = 100;

/// `infer_rows` of `Some(0)` reads every CSV column as String.
fn read_with_schema_length(path: &Path, infer_rows: Option<usize>) -> Result<DataFrame, IamError> {
    let mut df = match extension(path).as_str() {
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(infer_rows)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        "parquet" => ParquetReader::new(File::open(path)?).finish()?,
        other => {
            return Err(IamError::UnsupportedFormat(format!(
                "'{other}' for {}; use .csv or .parquet",
                path.display()
            )))
        }
    };

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    log::info!("read {} rows from {}", df.height(), path.display());
    Ok(df)
}

/// Write `df` as `.csv` or `.parquet`, creating parent directories.
pub fn write_frame(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<(), IamError> {
    let path = path.as_ref();
    let ext = extension(path);
    if ext != "csv" && ext != "parquet" {
        return Err(IamError::UnsupportedFormat(format!(
            "'{ext}' for {}; use .csv or .parquet",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    if ext == "csv" {
        CsvWriter::new(&mut file).finish(df)?;
    } else {
        ParquetWriter::new(&mut file).finish(df)?;
    }

    log::info!("wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Read IAMC timeseries data, and optionally its metadata table.
///
/// Data cells are read as strings and cast; metadata dtypes are inferred.
/// The data may be long (`year` and `value` columns) or wide (one column
/// per year).
pub fn read_iamc(
    data_path: impl AsRef<Path>,
    meta_path: Option<&Path>,
) -> Result<IamFrame, IamError> {
    let long = to_long(read_frame(data_path)?)?;
    let meta = meta_path.map(|p| read_meta(p)).transpose()?;
    IamFrame::new(long, meta)
}

/// Unpivot wide IAMC data into the long layout. Long data passes through.
///
/// Wide year columns are those whose name parses as an integer; all other
/// columns are kept as keys. Unparsable values become null.
pub fn to_long(raw: DataFrame) -> Result<DataFrame, IamError> {
    let names: Vec<String> = raw
        .get_column_names_str()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let is_long = [data::YEAR, data::VALUE]
        .iter()
        .all(|required| names.iter().any(|n| n.trim().eq_ignore_ascii_case(required)));
    if is_long {
        return Ok(raw);
    }

    let year_cols: Vec<(i64, &String)> = names
        .iter()
        .filter_map(|n| n.trim().parse::<i64>().ok().map(|y| (y, n)))
        .collect();
    if year_cols.is_empty() {
        return Err(IamError::InvalidData(
            "data has neither year/value columns nor year-named columns".to_string(),
        ));
    }
    let key_cols: Vec<&String> = names
        .iter()
        .filter(|n| n.trim().parse::<i64>().is_err())
        .collect();

    let mut long: Option<DataFrame> = None;
    for (year, name) in year_cols {
        let mut exprs: Vec<Expr> = key_cols.iter().map(|c| col(c.as_str())).collect();
        exprs.push(lit(year).alias(data::YEAR));
        exprs.push(col(name.as_str()).cast(DataType::Float64).alias(data::VALUE));

        let slice = raw.clone().lazy().select(exprs).collect()?;
        match long.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&slice)?;
            }
            None => long = Some(slice),
        }
    }

    long.ok_or_else(|| IamError::InvalidData("no year columns".to_string()))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn wide_is_unpivoted() {
        let wide = df![
            "Model" => &["m", "m"],
            "Scenario" => &["a", "a"],
            "Region" => &["World", "World"],
            "Variable" => &["CO2", "CH4"],
            "Unit" => &["Mt", "Mt"],
            "2030" => &["10", "8"],
            "2050" => &["0", ""],
        ]
        .unwrap();
        let long = to_long(wide).unwrap();
        assert_eq!(long.height(), 4);
        assert_eq!(long.width(), 7);

        // the empty cell is dropped on construction
        let frame = IamFrame::new(long, None).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.years().unwrap(), vec![2030, 2050]);
    }

    #[test]
    fn long_passes_through() {
        let long = df![
            "model" => &["m"],
            "scenario" => &["a"],
            "region" => &["World"],
            "variable" => &["CO2"],
            "unit" => &["Mt"],
            "Year" => &[2030i64],
            "Value" => &[1.0],
        ]
        .unwrap();
        let out = to_long(long.clone()).unwrap();
        assert!(out.equals(&long));
    }

    #[test]
    fn rejects_frames_without_years() {
        let df = df!["model" => &["m"], "scenario" => &["a"]].unwrap();
        assert!(matches!(to_long(df), Err(IamError::InvalidData(_))));
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        assert!(matches!(
            read_frame(&path),
            Err(IamError::UnsupportedFormat(_))
        ));
        let mut df = df!["a" => &[1i64]].unwrap();
        assert!(matches!(
            write_frame(&mut df, &path),
            Err(IamError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn parquet_round_trip_keeps_dtypes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("frame.parquet");
        let mut df = df!["year" => &[2030i64, 2050], "value" => &[1.5, 2.5]].unwrap();
        write_frame(&mut df, &path).unwrap();

        let back = read_frame(&path).unwrap();
        assert!(back.equals(&df));
    }

    #[test]
    fn csv_columns_are_trimmed_strings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.csv");
        fs::write(&path, " model ,scenario, netzero_year\nm,a,2050\n").unwrap();

        let df = read_frame(&path).unwrap();
        assert_eq!(df.get_column_names_str(), vec!["model", "scenario", "netzero_year"]);
        assert_eq!(df.column("netzero_year").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn meta_csv_infers_numeric_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.csv");
        fs::write(&path, "model,scenario,netzero_year\nm,a,2040.0\nm,b,\n").unwrap();

        let df = read_meta(&path).unwrap();
        let years = df.column("netzero_year").unwrap();
        assert_eq!(years.dtype(), &DataType::Float64);
        assert_eq!(years.null_count(), 1);
        assert_eq!(df.column("scenario").unwrap().dtype(), &DataType::String);
    }
}
