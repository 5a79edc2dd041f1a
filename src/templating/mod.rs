//! Tera bindings for the Data Manager.
//!
//! [`register_functions`] adds these global functions to a [`Tera`] instance.
//! Tera functions take named arguments only; `arg` is the optional extra
//! argument passed through to the datasource's reader.
//!
//! | Function                                 | Returns                    |
//! |------------------------------------------|----------------------------|
//! | `datasource(alias="x", arg="y")`         | decoded value              |
//! | `ds(alias="x", arg="y")`                 | same as `datasource`       |
//! | `datasource_exists(alias="x")`           | bool, never fails          |
//! | `datasource_reachable(alias="x", arg=..)`| bool, never fails          |
//! | `include(alias="x", arg="y")`            | raw payload as a string    |
//!
//! ```text
//! {% set cfg = datasource(alias="cfg") %}
//! listen {{ cfg.port }};
//! {% if datasource_reachable(alias="secrets", arg="db") %}
//! {% set db = ds(alias="secrets", arg="db") %}
//! password {{ db.value }};
//! {% endif %}
//! ```

use crate::data::DataManager;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Context as TeraContext, Tera, Value};

/// Register every datasource function on `tera`.
pub fn register_functions(tera: &mut Tera, data: Arc<DataManager>) {
    let retrieve = |data: Arc<DataManager>| {
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let (alias, extra) = call_args(args)?;
            data.get(&alias, &extra).map_err(|e| function_error(&alias, e))
        }
    };
    tera.register_function("datasource", retrieve(Arc::clone(&data)));
    tera.register_function("ds", retrieve(Arc::clone(&data)));

    let exists = Arc::clone(&data);
    tera.register_function("datasource_exists", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let (alias, _) = call_args(args)?;
        Ok(Value::Bool(exists.exists(&alias)))
    });

    let reachable = Arc::clone(&data);
    tera.register_function("datasource_reachable", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let (alias, extra) = call_args(args)?;
        Ok(Value::Bool(reachable.is_reachable(&alias, &extra)))
    });

    tera.register_function("include", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let (alias, extra) = call_args(args)?;
        data.include_raw(&alias, &extra).map(Value::String).map_err(|e| function_error(&alias, e))
    });
}

/// Render a one-off template string with the datasource functions available
/// and an empty context.
///
/// # Errors
///
/// Returns the [`tera::Error`] for a syntax error, an unknown function or a
/// failed datasource call.
pub fn render_str(template: &str, data: Arc<DataManager>) -> Result<String> {
    let mut tera = Tera::default();
    register_functions(&mut tera, data);

    tracing::debug!("Rendering template ({} bytes)", template.len());
    let rendered = tera.render_str(template, &TeraContext::new())?;
    Ok(rendered)
}

/// Extract `alias` and the optional `arg` from a function call.
fn call_args(args: &HashMap<String, Value>) -> tera::Result<(String, Vec<String>)> {
    let alias = match args.get("alias") {
        Some(Value::String(alias)) => alias.clone(),
        Some(other) => return Err(tera::Error::msg(format!("`alias` must be a string, got {other}"))),
        None => return Err(tera::Error::msg("missing required argument `alias`")),
    };

    let extra = match args.get("arg") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(arg)) => vec![arg.clone()],
        Some(other) => vec![other.to_string()],
    };
    Ok((alias, extra))
}

fn function_error(alias: &str, error: anyhow::Error) -> tera::Error {
    tera::Error::chain(format!("datasource '{alias}' failed: {error:#}"), error)
}
