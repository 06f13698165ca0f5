use std::collections::{BTreeSet, HashMap, HashSet};

use polars::prelude::*;

use crate::error::IamError;
use crate::interpolate::interpolate_year;
use crate::schema::{data, index};

/// Values of every non-`year`/`value` column for one row.
pub(crate) type SeriesKey = Vec<Option<String>>;

/// Long-format IAMC timeseries data with a metadata table aligned to its
/// (model, scenario) index.
///
/// Data columns: model, scenario, region, variable, unit, year, value, plus
/// any extra key columns. Key columns are String, `year` is Int64 and
/// `value` is Float64. Rows are sorted by key and year.
#[derive(Debug, Clone)]
pub struct IamFrame {
    data: DataFrame,
    meta: DataFrame,
}

impl IamFrame {
    /// Validate and normalise `data`, then align `meta` to its index.
    ///
    /// Required column names are matched case-insensitively. Rows with a
    /// null value are dropped. Duplicate (key, year) rows are rejected.
    pub fn new(data: DataFrame, meta: Option<DataFrame>) -> Result<Self, IamError> {
        let data = normalize_data(data)?;
        let meta = align_meta(&data, meta)?;
        Ok(Self { data, meta })
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn meta(&self) -> &DataFrame {
        &self.meta
    }

    pub fn into_parts(self) -> (DataFrame, DataFrame) {
        (self.data, self.meta)
    }

    pub fn len(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    /// Sorted unique (model, scenario) pairs present in the data.
    pub fn index(&self) -> Result<Vec<(String, String)>, IamError> {
        Ok(index_pairs(&self.data)?.into_iter().collect())
    }

    /// Sorted unique years present in the data.
    pub fn years(&self) -> Result<Vec<i64>, IamError> {
        let years: BTreeSet<i64> = self
            .data
            .column(data::YEAR)?
            .i64()?
            .into_iter()
            .flatten()
            .collect();
        Ok(years.into_iter().collect())
    }

    pub fn filter_scenario(&self, model: &str, scenario: &str) -> Result<Self, IamError> {
        let predicate = || {
            col(index::MODEL)
                .eq(lit(model))
                .and(col(index::SCENARIO).eq(lit(scenario)))
        };
        let data = self.data.clone().lazy().filter(predicate()).collect()?;
        let meta = self.meta.clone().lazy().filter(predicate()).collect()?;
        Ok(Self { data, meta })
    }

    pub fn filter_year(&self, year: i64) -> Result<Self, IamError> {
        let data = self
            .data
            .clone()
            .lazy()
            .filter(col(data::YEAR).eq(lit(year)))
            .collect()?;
        let meta = align_meta(&data, Some(self.meta.clone()))?;
        Ok(Self { data, meta })
    }

    /// Linearly interpolate every timeseries to `year`.
    ///
    /// Existing values at `year` are kept. A timeseries without data on
    /// both sides of `year` fails with [`IamError::Interpolation`].
    pub fn interpolate(&self, year: i64) -> Result<Self, IamError> {
        let data = sort_data(interpolate_year(&self.data, year)?)?;
        Ok(Self {
            data,
            meta: self.meta.clone(),
        })
    }

    /// Raw metadata cell for a scenario; `Null` if the pair has no entry.
    pub fn meta_value(
        &self,
        model: &str,
        scenario: &str,
        column: &str,
    ) -> Result<AnyValue<'_>, IamError> {
        let values = self
            .meta
            .column(column)
            .map_err(|_| IamError::ColumnNotFound(column.to_string()))?;
        let models = self.meta.column(index::MODEL)?.str()?;
        let scenarios = self.meta.column(index::SCENARIO)?.str()?;

        for i in 0..self.meta.height() {
            if models.get(i) == Some(model) && scenarios.get(i) == Some(scenario) {
                return Ok(values.get(i)?);
            }
        }
        Ok(AnyValue::Null)
    }

    /// Split into one frame per (model, scenario) pair, in index order.
    ///
    /// Data and metadata are each partitioned once, so the cost is linear in
    /// the number of rows rather than scenarios × rows.
    pub fn partition_scenarios(&self) -> Result<Vec<((String, String), IamFrame)>, IamError> {
        let mut metas: HashMap<(String, String), DataFrame> = HashMap::new();
        for part in self.meta.partition_by(index::ALL, true)? {
            if let Some(pair) = first_pair(&part)? {
                metas.insert(pair, part);
            }
        }

        let mut parts = Vec::with_capacity(metas.len());
        for data in self.data.partition_by(index::ALL, true)? {
            let Some(pair) = first_pair(&data)? else {
                continue;
            };
            let meta = metas.remove(&pair).unwrap_or_else(|| self.meta.clear());
            parts.push((pair, IamFrame { data, meta }));
        }
        parts.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(parts)
    }

    pub fn has_meta_column(&self, column: &str) -> bool {
        self.meta.column(column).is_ok()
    }

    /// Stack frames vertically. All frames must share the same data and
    /// metadata schemas.
    pub fn concat(frames: impl IntoIterator<Item = IamFrame>) -> Result<Self, IamError> {
        let mut data: Option<DataFrame> = None;
        let mut meta: Option<DataFrame> = None;

        for frame in frames {
            let (d, m) = frame.into_parts();
            match data.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&d)?;
                }
                None => data = Some(d),
            }
            match meta.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&m)?;
                }
                None => meta = Some(m),
            }
        }

        let data = data.ok_or_else(|| {
            IamError::InvalidData("cannot concatenate an empty list of frames".into())
        })?;
        Self::new(data, meta)
    }
}

// ── Normalisation ───────────────────────────────────────────────────────────

fn normalize_data(df: DataFrame) -> Result<DataFrame, IamError> {
    let df = lowercase_columns(df, &data::REQUIRED)?;
    require_columns(&df, &data::REQUIRED)?;

    let mut casts: Vec<Expr> = key_column_names(&df)
        .iter()
        .map(|c| col(c.as_str()).cast(DataType::String))
        .collect();
    casts.push(col(data::YEAR).cast(DataType::Int64));
    casts.push(col(data::VALUE).cast(DataType::Float64));

    let df = df
        .lazy()
        .with_columns(casts)
        .filter(col(data::VALUE).is_not_null())
        .collect()?;

    for name in [
        index::MODEL,
        index::SCENARIO,
        data::REGION,
        data::VARIABLE,
        data::UNIT,
        data::YEAR,
    ] {
        let null_count = df.column(name)?.null_count();
        if null_count > 0 {
            return Err(IamError::InvalidData(format!(
                "Column '{name}' has {null_count} null values"
            )));
        }
    }

    check_duplicates(&df)?;
    sort_data(df)
}

/// Rename columns whose trimmed, lower-cased name is in `targets`.
fn lowercase_columns(mut df: DataFrame, targets: &[&str]) -> Result<DataFrame, IamError> {
    let renamed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| {
            let lower = c.trim().to_lowercase();
            if targets.contains(&lower.as_str()) {
                lower
            } else {
                c.to_string()
            }
        })
        .collect();
    df.set_column_names(renamed.as_slice())?;
    Ok(df)
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), IamError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(IamError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn check_duplicates(df: &DataFrame) -> Result<(), IamError> {
    let (_, keys) = series_keys(df)?;
    let years = df.column(data::YEAR)?.i64()?;

    let mut seen = HashSet::with_capacity(keys.len());
    for (i, key) in keys.into_iter().enumerate() {
        let entry = (key, years.get(i));
        if seen.contains(&entry) {
            return Err(IamError::DuplicateRows(format!(
                "{} at year {}",
                describe_key(&entry.0),
                entry.1.unwrap_or_default()
            )));
        }
        seen.insert(entry);
    }
    Ok(())
}

fn sort_data(df: DataFrame) -> Result<DataFrame, IamError> {
    let mut by = key_column_names(&df);
    by.push(data::YEAR.to_string());
    Ok(df.lazy().sort(by, SortMultipleOptions::default()).collect()?)
}

// ── Metadata alignment ──────────────────────────────────────────────────────

fn align_meta(data: &DataFrame, meta: Option<DataFrame>) -> Result<DataFrame, IamError> {
    let pairs = index_pairs(data)?;
    let index_df = index_frame(&pairs)?;
    let Some(meta) = meta else {
        return Ok(index_df);
    };

    let meta = lowercase_columns(meta, &index::ALL)?;
    require_columns(&meta, &index::ALL)?;
    let meta = meta
        .lazy()
        .with_columns([
            col(index::MODEL).cast(DataType::String),
            col(index::SCENARIO).cast(DataType::String),
        ])
        .collect()?;

    let models = meta.column(index::MODEL)?.str()?;
    let scenarios = meta.column(index::SCENARIO)?.str()?;
    let mut seen = HashSet::with_capacity(meta.height());
    let mut dropped = 0usize;
    for i in 0..meta.height() {
        let (Some(model), Some(scenario)) = (models.get(i), scenarios.get(i)) else {
            dropped += 1;
            continue;
        };
        let pair = (model.to_string(), scenario.to_string());
        if !pairs.contains(&pair) {
            dropped += 1;
        }
        if !seen.insert(pair) {
            return Err(IamError::DuplicateRows(format!(
                "metadata for {model}|{scenario}"
            )));
        }
    }
    if dropped > 0 {
        log::debug!("dropping {dropped} metadata rows not in the data index");
    }

    let aligned = index_df
        .lazy()
        .join(
            meta.lazy(),
            [col(index::MODEL), col(index::SCENARIO)],
            [col(index::MODEL), col(index::SCENARIO)],
            JoinArgs::new(JoinType::Left),
        )
        .sort(index::ALL, SortMultipleOptions::default())
        .collect()?;
    Ok(aligned)
}

fn index_pairs(df: &DataFrame) -> Result<BTreeSet<(String, String)>, IamError> {
    let models = df.column(index::MODEL)?.str()?;
    let scenarios = df.column(index::SCENARIO)?.str()?;
    Ok(models
        .into_iter()
        .zip(scenarios.into_iter())
        .filter_map(|pair| match pair {
            (Some(m), Some(s)) => Some((m.to_string(), s.to_string())),
            _ => None,
        })
        .collect())
}

fn first_pair(df: &DataFrame) -> Result<Option<(String, String)>, IamError> {
    let models = df.column(index::MODEL)?.str()?;
    let scenarios = df.column(index::SCENARIO)?.str()?;
    Ok(models
        .get(0)
        .zip(scenarios.get(0))
        .map(|(m, s)| (m.to_string(), s.to_string())))
}

fn index_frame(pairs: &BTreeSet<(String, String)>) -> Result<DataFrame, IamError> {
    let (models, scenarios): (Vec<String>, Vec<String>) = pairs.iter().cloned().unzip();
    Ok(DataFrame::new(vec![
        Column::new(index::MODEL.into(), models),
        Column::new(index::SCENARIO.into(), scenarios),
    ])?)
}

// ── Timeseries keys ─────────────────────────────────────────────────────────

/// Every column except `year` and `value`, in frame order.
pub(crate) fn key_column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names_str()
        .iter()
        .filter(|c| **c != data::YEAR && **c != data::VALUE)
        .map(|c| c.to_string())
        .collect()
}

/// Key column names and the key of each row. Key columns must be String.
pub(crate) fn series_keys(df: &DataFrame) -> Result<(Vec<String>, Vec<SeriesKey>), IamError> {
    let names = key_column_names(df);
    let columns = names
        .iter()
        .map(|name| df.column(name).and_then(|c| c.str()))
        .collect::<PolarsResult<Vec<_>>>()?;

    let keys = (0..df.height())
        .map(|i| {
            columns
                .iter()
                .map(|c| c.get(i).map(str::to_string))
                .collect()
        })
        .collect();
    Ok((names, keys))
}

pub(crate) fn describe_key(key: &[Option<String>]) -> String {
    key.iter()
        .map(|v| v.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("|")
}
