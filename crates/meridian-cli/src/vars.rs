//! Variable scope assembly from the environment and -var arguments.

use std::collections::HashMap;

use anyhow::bail;

use meridian_model::is_valid_identifier;

/// Builds the variable scope for `${name}` interpolation.
///
/// Environment variables (when `include_env`) come first, keeping only those
/// whose names are valid identifiers; `--var` definitions override them. A
/// definition with an empty value removes the variable from scope. Names and
/// values are trimmed.
pub fn collect(definitions: &[String], include_env: bool) -> anyhow::Result<HashMap<String, String>> {
    let mut variables = HashMap::new();
    if include_env {
        for (name, value) in std::env::vars() {
            let name = name.trim();
            if is_valid_identifier(name) {
                variables.insert(name.to_owned(), value.trim().to_owned());
            }
        }
    }
    for definition in definitions {
        let Some((name, value)) = definition.split_once('=') else {
            bail!("invalid variable declaration {definition:?}");
        };
        let name = name.trim();
        let value = value.trim();
        if !is_valid_identifier(name) {
            bail!("invalid variable name {name:?}");
        }
        if value.is_empty() {
            variables.remove(name);
        } else {
            variables.insert(name.to_owned(), value.to_owned());
        }
    }
    Ok(variables)
}
