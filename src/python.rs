//! Python extension module.
//!
//! Exposes the activities the way a Python chaos experiment runner expects
//! them: plain functions taking `configuration` and `secrets` dicts and
//! returning dicts, under `chaosdynamo.actions` and `chaosdynamo.probes`.

use once_cell::sync::Lazy;
use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyType};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::activity::DynamoDbActivities;
use crate::errors::ActivityFailure;

create_exception!(chaosdynamo, ActivityFailed, PyException);

static ACTIVITIES: Lazy<DynamoDbActivities> = Lazy::new(DynamoDbActivities::new);

/// Copy a Python dict into a JSON map via the `json` module.
///
/// `name` is the argument the dict was passed as, used in error messages.
fn to_map(
    py: Python<'_>,
    name: &str,
    dict: Option<&Bound<'_, PyDict>>,
) -> PyResult<HashMap<String, Value>> {
    let Some(dict) = dict else {
        return Ok(HashMap::new());
    };
    let json: String = py
        .import("json")?
        .call_method1("dumps", (dict,))
        .map_err(|e| PyValueError::new_err(argument_error(name, "JSON serializable", e)))?
        .extract()?;
    serde_json::from_str(&json)
        .map_err(|e| PyValueError::new_err(argument_error(name, "a JSON object", e)))
}

fn argument_error(name: &str, expected: &str, cause: impl std::fmt::Display) -> String {
    format!("\"{name}\" must be {expected}: {cause}")
}

fn to_py<T: Serialize>(py: Python<'_>, value: &T) -> PyResult<Py<PyAny>> {
    let json = serde_json::to_string(value)
        .map_err(|e| PyValueError::new_err(format!("Failed to serialize response: {}", e)))?;
    Ok(py.import("json")?.call_method1("loads", (json,))?.unbind())
}

/// Raise chaoslib's `ActivityFailed` when chaoslib is installed, ours otherwise.
fn to_py_err(py: Python<'_>, failure: ActivityFailure) -> PyErr {
    let message = failure.message().to_string();
    let chaoslib = py
        .import("chaoslib.exceptions")
        .and_then(|m| m.getattr("ActivityFailed"))
        .and_then(|cls| Ok(cls.cast_into::<PyType>()?));

    match chaoslib {
        Ok(ty) => PyErr::from_type(ty, message),
        Err(_) => ActivityFailed::new_err(message),
    }
}

fn respond<T: Serialize>(py: Python<'_>, result: Result<T, ActivityFailure>) -> PyResult<Py<PyAny>> {
    match result {
        Ok(value) => to_py(py, &value),
        Err(failure) => Err(to_py_err(py, failure)),
    }
}

// ========== ACTIONS ==========

/// Delete a DynamoDB table and all the items contained within.
#[pyfunction]
#[pyo3(signature = (table_name, create_backup=false, backup_name=None, configuration=None, secrets=None))]
fn delete_table(
    py: Python<'_>,
    table_name: &str,
    create_backup: bool,
    backup_name: Option<&str>,
    configuration: Option<&Bound<'_, PyDict>>,
    secrets: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let configuration = to_map(py, "configuration", configuration)?;
    let secrets = to_map(py, "secrets", secrets)?;
    let result = py.detach(|| {
        ACTIVITIES.delete_table(table_name, create_backup, backup_name, &configuration, &secrets)
    });
    respond(py, result)
}

/// Create a backup for an existing DynamoDB table.
#[pyfunction]
#[pyo3(signature = (table_name, backup_name, configuration=None, secrets=None))]
fn backup_table(
    py: Python<'_>,
    table_name: &str,
    backup_name: &str,
    configuration: Option<&Bound<'_, PyDict>>,
    secrets: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let configuration = to_map(py, "configuration", configuration)?;
    let secrets = to_map(py, "secrets", secrets)?;
    let result =
        py.detach(|| ACTIVITIES.backup_table(table_name, backup_name, &configuration, &secrets));
    respond(py, result)
}

/// Toggle point in time recovery for the specified table.
#[pyfunction]
#[pyo3(signature = (table_name, point_in_time_enabled, configuration=None, secrets=None))]
fn set_continuous_backups(
    py: Python<'_>,
    table_name: &str,
    point_in_time_enabled: bool,
    configuration: Option<&Bound<'_, PyDict>>,
    secrets: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let configuration = to_map(py, "configuration", configuration)?;
    let secrets = to_map(py, "secrets", secrets)?;
    let result = py.detach(|| {
        ACTIVITIES.set_continuous_backups(
            table_name,
            point_in_time_enabled,
            &configuration,
            &secrets,
        )
    });
    respond(py, result)
}

// ========== PROBES ==========

/// Describe a DynamoDB table.
#[pyfunction]
#[pyo3(name = "describe_table", signature = (table_name, configuration=None, secrets=None))]
fn probe_describe_table(
    py: Python<'_>,
    table_name: &str,
    configuration: Option<&Bound<'_, PyDict>>,
    secrets: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let configuration = to_map(py, "configuration", configuration)?;
    let secrets = to_map(py, "secrets", secrets)?;
    let result = py.detach(|| ACTIVITIES.describe_table(table_name, &configuration, &secrets));
    respond(py, result)
}

/// Get the status of continuous backups for a DynamoDB table.
#[pyfunction]
#[pyo3(name = "describe_continuous_backups", signature = (table_name, configuration=None, secrets=None))]
fn probe_describe_continuous_backups(
    py: Python<'_>,
    table_name: &str,
    configuration: Option<&Bound<'_, PyDict>>,
    secrets: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let configuration = to_map(py, "configuration", configuration)?;
    let secrets = to_map(py, "secrets", secrets)?;
    let result = py.detach(|| {
        ACTIVITIES.describe_continuous_backups(table_name, &configuration, &secrets)
    });
    respond(py, result)
}

/// Get information about a specific DynamoDB table backup.
#[pyfunction]
#[pyo3(name = "describe_backup", signature = (backup_arn, configuration=None, secrets=None))]
fn probe_describe_backup(
    py: Python<'_>,
    backup_arn: &str,
    configuration: Option<&Bound<'_, PyDict>>,
    secrets: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let configuration = to_map(py, "configuration", configuration)?;
    let secrets = to_map(py, "secrets", secrets)?;
    let result = py.detach(|| ACTIVITIES.describe_backup(backup_arn, &configuration, &secrets));
    respond(py, result)
}

/// Add `child` to `parent` and make it importable as `chaosdynamo.<child>`.
fn add_submodule<'py>(parent: &Bound<'py, PyModule>, child: &Bound<'py, PyModule>) -> PyResult<()> {
    parent.add_submodule(child)?;
    let name = format!("chaosdynamo.{}", child.name()?);
    parent
        .py()
        .import("sys")?
        .getattr("modules")?
        .set_item(name, child)
}

#[pymodule]
fn chaosdynamo(m: &Bound<'_, PyModule>) -> PyResult<()> {
    crate::logging::init_logging();
    let py = m.py();
    m.add("ActivityFailed", py.get_type::<ActivityFailed>())?;

    let actions = PyModule::new(py, "actions")?;
    actions.add_function(wrap_pyfunction!(delete_table, &actions)?)?;
    actions.add_function(wrap_pyfunction!(backup_table, &actions)?)?;
    actions.add_function(wrap_pyfunction!(set_continuous_backups, &actions)?)?;
    add_submodule(m, &actions)?;

    let probes = PyModule::new(py, "probes")?;
    probes.add_function(wrap_pyfunction!(probe_describe_table, &probes)?)?;
    probes.add_function(wrap_pyfunction!(probe_describe_continuous_backups, &probes)?)?;
    probes.add_function(wrap_pyfunction!(probe_describe_backup, &probes)?)?;
    add_submodule(m, &probes)?;

    Ok(())
}
