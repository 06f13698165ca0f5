use std::collections::HashMap;

use polars::prelude::*;

use crate::error::IamError;
use crate::frame::{describe_key, series_keys, SeriesKey};
use crate::schema::data;

/// Append a linearly interpolated row at `year` to every timeseries that
/// lacks one. Expects a normalised long-format frame.
pub(crate) fn interpolate_year(df: &DataFrame, year: i64) -> Result<DataFrame, IamError> {
    let (key_names, keys) = series_keys(df)?;
    let years = df.column(data::YEAR)?.i64()?;
    let values = df.column(data::VALUE)?.f64()?;

    let mut order: Vec<SeriesKey> = Vec::new();
    let mut points: HashMap<SeriesKey, Vec<(i64, f64)>> = HashMap::new();
    for (i, key) in keys.into_iter().enumerate() {
        let (Some(y), Some(v)) = (years.get(i), values.get(i)) else {
            continue;
        };
        if !points.contains_key(&key) {
            order.push(key.clone());
        }
        points.entry(key).or_default().push((y, v));
    }

    let mut new_keys: Vec<SeriesKey> = Vec::new();
    let mut new_values: Vec<f64> = Vec::new();
    for key in order {
        let series = &points[&key];
        if series.iter().any(|(y, _)| *y == year) {
            continue;
        }
        let value = linear(series, year).ok_or_else(|| IamError::Interpolation {
            year,
            timeseries: describe_key(&key),
        })?;
        new_keys.push(key);
        new_values.push(value);
    }

    if new_keys.is_empty() {
        return Ok(df.clone());
    }
    log::debug!("interpolated {} timeseries at {year}", new_keys.len());

    let additions = build_rows(df, &key_names, &new_keys, year, new_values)?;
    let mut out = df.clone();
    out.vstack_mut(&additions)?;
    Ok(out)
}

/// Value at `year` on the segment between the nearest points either side.
fn linear(series: &[(i64, f64)], year: i64) -> Option<f64> {
    let &(y0, v0) = series
        .iter()
        .filter(|(y, _)| *y < year)
        .max_by_key(|(y, _)| *y)?;
    let &(y1, v1) = series
        .iter()
        .filter(|(y, _)| *y > year)
        .min_by_key(|(y, _)| *y)?;
    Some(v0 + (v1 - v0) * (year - y0) as f64 / (y1 - y0) as f64)
}

/// Build rows with the same column order and dtypes as `template`.
fn build_rows(
    template: &DataFrame,
    key_names: &[String],
    keys: &[SeriesKey],
    year: i64,
    values: Vec<f64>,
) -> Result<DataFrame, IamError> {
    let mut columns: Vec<Column> = Vec::with_capacity(template.width());
    let mut values = Some(values);

    for name in template.get_column_names_str() {
        let column = match name {
            data::YEAR => Column::new(name.into(), vec![year; keys.len()]),
            data::VALUE => Column::new(name.into(), values.take().unwrap_or_default()),
            _ => {
                let pos = key_names
                    .iter()
                    .position(|k| k == name)
                    .ok_or_else(|| IamError::ColumnNotFound(name.to_string()))?;
                let cells: Vec<Option<String>> = keys.iter().map(|k| k[pos].clone()).collect();
                Column::new(name.into(), cells)
            }
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}
