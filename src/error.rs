use thiserror::Error;

#[derive(Error, Debug)]
pub enum IamError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Duplicate rows in data: {0}")]
    DuplicateRows(String),

    #[error("Cannot interpolate {timeseries} at year {year}: no bounding years")]
    Interpolation { year: i64, timeseries: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "python")]
impl From<IamError> for pyo3::PyErr {
    fn from(err: IamError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}
