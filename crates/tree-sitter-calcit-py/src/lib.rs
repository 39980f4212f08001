//! Python bindings for the Calcit grammar.

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;

/// A loaded grammar descriptor.
#[pyclass(name = "Language", module = "tree_sitter_calcit", frozen)]
struct PyLanguage {
    inner: tree_sitter_calcit::Language,
}

#[pymethods]
impl PyLanguage {
    #[getter]
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[getter]
    fn version(&self) -> usize {
        self.inner.version()
    }

    #[getter]
    fn node_kind_count(&self) -> usize {
        self.inner.node_kind_count()
    }

    #[getter]
    fn field_count(&self) -> usize {
        self.inner.field_count()
    }

    fn node_kind_for_id(&self, id: u16) -> Option<&str> {
        self.inner.node_kind_for_id(id)
    }

    #[pyo3(signature = (kind, named = true))]
    fn id_for_node_kind(&self, kind: &str, named: bool) -> Option<u16> {
        self.inner.id_for_node_kind(kind, named)
    }

    fn field_name_for_id(&self, id: u16) -> Option<&str> {
        self.inner.field_name_for_id(id)
    }

    fn node_types_json(&self) -> PyResult<String> {
        self.inner
            .node_types_json()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "<Language {} ({} node kinds)>",
            self.inner.name(),
            self.inner.node_kind_count()
        )
    }
}

/// Load the bundled Calcit grammar.
#[pyfunction]
fn language() -> PyResult<PyLanguage> {
    tree_sitter_calcit::language()
        .map(|inner| PyLanguage { inner })
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

#[pymodule]
fn _calcit(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyLanguage>()?;
    m.add_function(wrap_pyfunction!(language, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
