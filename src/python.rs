use std::path::Path;

use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::frame::IamFrame;
use crate::io;
use crate::netzero::NetzeroConfig;
use crate::schema::{self, REFERENCE_YEAR};

#[pyclass(name = "IamFrame")]
pub struct PyIamFrame {
    inner: IamFrame,
}

#[pymethods]
impl PyIamFrame {
    #[new]
    #[pyo3(signature = (data, meta=None))]
    fn new(data: PyDataFrame, meta: Option<PyDataFrame>) -> PyResult<Self> {
        let inner = IamFrame::new(data.0, meta.map(|m| m.0))?;
        Ok(Self { inner })
    }

    // ── I/O ─────────────────────────────────────────────────────────────────

    /// Read IAMC data (wide or long, .csv or .parquet) and optional metadata.
    #[staticmethod]
    #[pyo3(signature = (data_path, meta_path=None))]
    fn read(data_path: &str, meta_path: Option<&str>) -> PyResult<Self> {
        let inner = io::read_iamc(data_path, meta_path.map(Path::new))?;
        Ok(Self { inner })
    }

    /// Write the long-format data to .csv or .parquet.
    fn write(&self, path: &str) -> PyResult<()> {
        let mut df = self.inner.data().clone();
        io::write_frame(&mut df, path)?;
        Ok(())
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn data(&self) -> PyDataFrame {
        PyDataFrame(self.inner.data().clone())
    }

    #[getter]
    fn meta(&self) -> PyDataFrame {
        PyDataFrame(self.inner.meta().clone())
    }

    fn index(&self) -> PyResult<Vec<(String, String)>> {
        Ok(self.inner.index()?)
    }

    fn years(&self) -> PyResult<Vec<i64>> {
        Ok(self.inner.years()?)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    // ── Transformations ─────────────────────────────────────────────────────

    fn filter(&self, model: &str, scenario: &str) -> PyResult<Self> {
        let inner = self.inner.filter_scenario(model, scenario)?;
        Ok(Self { inner })
    }

    fn filter_year(&self, year: i64) -> PyResult<Self> {
        let inner = self.inner.filter_year(year)?;
        Ok(Self { inner })
    }

    fn interpolate(&self, year: i64) -> PyResult<Self> {
        let inner = self.inner.interpolate(year)?;
        Ok(Self { inner })
    }

    /// Select each scenario's year from `meta_column` (or `default_year`)
    /// and collapse to a single-year frame at `reference_year`.
    #[pyo3(signature = (meta_column, default_year, reference_year=REFERENCE_YEAR))]
    fn netzero_data(
        &self,
        meta_column: &str,
        default_year: i64,
        reference_year: i64,
    ) -> PyResult<Self> {
        let inner = NetzeroConfig::new(meta_column, default_year)
            .with_reference_year(reference_year)
            .apply(&self.inner)?;
        Ok(Self { inner })
    }
}

/// Reformat long-format IAMC data selecting each scenario's year via a meta
/// column. Returns `(data, meta)`.
#[pyfunction]
#[pyo3(name = "get_netzero_data", signature = (data, meta_column, default_year, meta=None))]
fn py_get_netzero_data(
    data: PyDataFrame,
    meta_column: &str,
    default_year: i64,
    meta: Option<PyDataFrame>,
) -> PyResult<(PyDataFrame, PyDataFrame)> {
    let frame = IamFrame::new(data.0, meta.map(|m| m.0))?;
    let (data, meta) = crate::netzero::get_netzero_data(&frame, meta_column, default_year)?
        .into_parts();
    Ok((PyDataFrame(data), PyDataFrame(meta)))
}

/// Export schema constants as a Python submodule
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let schema_mod = PyModule::new(m.py(), "schema")?;
    schema_mod.add("MODEL", schema::index::MODEL)?;
    schema_mod.add("SCENARIO", schema::index::SCENARIO)?;
    schema_mod.add("REGION", schema::data::REGION)?;
    schema_mod.add("VARIABLE", schema::data::VARIABLE)?;
    schema_mod.add("UNIT", schema::data::UNIT)?;
    schema_mod.add("YEAR", schema::data::YEAR)?;
    schema_mod.add("VALUE", schema::data::VALUE)?;
    schema_mod.add("REFERENCE_YEAR", REFERENCE_YEAR)?;
    m.add_submodule(&schema_mod)?;
    Ok(())
}

#[pymodule]
#[pyo3(name = "_core")]
fn core_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyIamFrame>()?;
    m.add_function(wrap_pyfunction!(py_get_netzero_data, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
