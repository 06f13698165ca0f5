use std::collections::HashMap;

use polars::prelude::*;

use crate::error::IamError;
use crate::frame::IamFrame;
use crate::schema::{data, index, REFERENCE_YEAR};

/// Settings for collapsing a multi-year frame to one year per scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetzeroConfig {
    /// Metadata column holding the year to select for each scenario.
    pub meta_column: String,
    /// Year used when the metadata cell is missing or not an integer.
    pub default_year: i64,
    /// Year written to every output row.
    pub reference_year: i64,
}

impl NetzeroConfig {
    pub fn new(meta_column: impl Into<String>, default_year: i64) -> Self {
        Self {
            meta_column: meta_column.into(),
            default_year,
            reference_year: REFERENCE_YEAR,
        }
    }

    pub fn with_reference_year(mut self, year: i64) -> Self {
        self.reference_year = year;
        self
    }

    /// Year to select for one scenario, falling back to the default year.
    pub fn select_year(
        &self,
        frame: &IamFrame,
        model: &str,
        scenario: &str,
    ) -> Result<i64, IamError> {
        let value = frame.meta_value(model, scenario, &self.meta_column)?;
        Ok(self.resolve_year(model, scenario, &value))
    }

    /// Selected year for every scenario with a metadata row, in one pass
    /// over the metadata table.
    pub fn select_years(
        &self,
        frame: &IamFrame,
    ) -> Result<HashMap<(String, String), i64>, IamError> {
        let meta = frame.meta();
        let values = meta
            .column(&self.meta_column)
            .map_err(|_| IamError::ColumnNotFound(self.meta_column.clone()))?;
        let models = meta.column(index::MODEL)?.str()?;
        let scenarios = meta.column(index::SCENARIO)?.str()?;

        let mut years = HashMap::with_capacity(meta.height());
        for i in 0..meta.height() {
            let (Some(model), Some(scenario)) = (models.get(i), scenarios.get(i)) else {
                continue;
            };
            let year = self.resolve_year(model, scenario, &values.get(i)?);
            years.insert((model.to_string(), scenario.to_string()), year);
        }
        Ok(years)
    }

    fn resolve_year(&self, model: &str, scenario: &str, value: &AnyValue) -> i64 {
        match parse_year(value) {
            Some(year) => year,
            None => {
                log::debug!(
                    "{model}|{scenario}: '{}' = {value} is not a year, using {}",
                    self.meta_column,
                    self.default_year
                );
                self.default_year
            }
        }
    }

    /// Take each scenario's data at its selected year (interpolating where
    /// needed) and stack the slices with `year` set to the reference year.
    ///
    /// Metadata is carried over unchanged.
    pub fn apply(&self, frame: &IamFrame) -> Result<IamFrame, IamError> {
        let years = self.select_years(frame)?;
        let parts = frame.partition_scenarios()?;
        if parts.is_empty() {
            return IamFrame::new(frame.data().clear(), Some(frame.meta().clone()));
        }

        let scenario_count = parts.len();
        let mut slices = Vec::with_capacity(scenario_count);
        for ((model, scenario), part) in parts {
            let year = years
                .get(&(model.clone(), scenario.clone()))
                .copied()
                .unwrap_or(self.default_year);
            log::debug!("{model}|{scenario}: selecting year {year}");

            slices.push(part.interpolate(year)?.filter_year(year)?);
        }

        let (stacked, meta) = IamFrame::concat(slices)?.into_parts();
        let stacked = stacked
            .lazy()
            .with_columns([lit(self.reference_year).alias(data::YEAR)])
            .collect()?;

        log::info!(
            "collapsed {scenario_count} scenarios to {} rows at reference year {}",
            stacked.height(),
            self.reference_year
        );
        IamFrame::new(stacked, Some(meta))
    }
}

/// Reformat `frame` selecting each scenario's year from `meta_column`,
/// falling back to `default_year`. Output rows carry year 0.
pub fn get_netzero_data(
    frame: &IamFrame,
    meta_column: &str,
    default_year: i64,
) -> Result<IamFrame, IamError> {
    NetzeroConfig::new(meta_column, default_year).apply(frame)
}

/// Integer year held by a metadata cell, if any.
///
/// Integers pass through, finite floats truncate toward zero, and strings
/// are trimmed then parsed as base-10 integers. Everything else is `None`,
/// including booleans and infinite floats, which fall back to the default
/// year instead of being read as 1/0 or raising an overflow.
pub fn parse_year(value: &AnyValue) -> Option<i64> {
    match value {
        AnyValue::Null | AnyValue::Boolean(_) => None,
        AnyValue::String(s) => s.trim().parse().ok(),
        AnyValue::StringOwned(s) => s.as_str().trim().parse().ok(),
        AnyValue::Float32(f) => truncate(f64::from(*f)),
        AnyValue::Float64(f) => truncate(*f),
        other if other.dtype().is_integer() => other.extract::<i64>(),
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    f.is_finite().then(|| f.trunc() as i64)
}
