//! Definition file loading: variable interpolation and TOML parsing.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ModelError, ModelResult};
use crate::types::Root;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern compiles")
    })
}

/// Expands every `${name}` occurrence in `source` from `variables`.
///
/// Referencing a variable that is not in scope is an error; a configuration
/// that silently keeps the placeholder would deploy the placeholder.
pub fn interpolate(source: &str, variables: &HashMap<String, String>) -> ModelResult<String> {
    let mut result = String::with_capacity(source.len());
    let mut last = 0;
    for captures in variable_pattern().captures_iter(source) {
        let whole = captures.get(0).expect("capture group 0 always present");
        let name = &captures[1];
        let value = variables
            .get(name)
            .ok_or_else(|| ModelError::UndefinedVariable(name.to_owned()))?;
        result.push_str(&source[last..whole.start()]);
        result.push_str(value);
        last = whole.end();
    }
    result.push_str(&source[last..]);
    Ok(result)
}

/// Parses a definition file after applying variable interpolation.
pub fn parse(source: &str, variables: &HashMap<String, String>) -> ModelResult<Root> {
    let expanded = interpolate(source, variables)?;
    Ok(toml::from_str(&expanded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeploymentType, FrameworkType};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[test]
    fn interpolation_replaces_known_variables() {
        let variables = vars(&[("env", "prod"), ("region", "eu")]);
        let expanded = interpolate("name-${env}-${region}-${env}", &variables).unwrap();
        assert_eq!(expanded, "name-prod-eu-prod");
    }

    #[test]
    fn interpolation_rejects_undefined_variables() {
        assert!(matches!(
            interpolate("x=${missing}", &HashMap::new()),
            Err(ModelError::UndefinedVariable(name)) if name == "missing"
        ));
    }

    #[test]
    fn interpolation_leaves_non_variable_text_alone() {
        let source = "plain $ text ${not-an-identifier} $ {spaced}";
        assert_eq!(interpolate(source, &HashMap::new()).unwrap(), source);
    }

    #[test]
    fn parse_full_definition() {
        let variables = vars(&[("master", "10.0.0.1:5050")]);
        let source = r#"
            [mesos]
            zookeepers = "zk://10.0.0.1:2181/mesos"
            masters = ["${master}"]

            [[framework]]
            type = "marathon"
            name = "default"
            mesos_name = "marathon"
            masters = ["${master}"]

            [[framework]]
            type = "chronos"
            name = "default"
            mesos_name = "chronos"
            masters = ["${master}"]

            [framework.created_by_deployment]
            type = "marathon_app"
            name = "chronos"

            [[deployment]]
            type = "marathon_app"
            name = "chronos"
            deploy = "chronos.json"
            labels = ["infra"]

            [[deployment]]
            type = "chronos_job"
            name = "cleanup"
            framework = "default"
            deploy = "cleanup.json"

            [[deployment.dependency]]
            type = "marathon_app"
            name = "chronos"
            wait_for_healthy = true

            [[deployment.dependency_of]]
            type = "*"

            [[deployment.dependency_of.filter]]
            key = "labels"
            value = "late"
        "#;
        let root = parse(source, &variables).unwrap();

        let mesos = root.mesos.unwrap();
        assert_eq!(mesos.masters, vec!["10.0.0.1:5050"]);

        assert_eq!(root.frameworks.len(), 2);
        assert_eq!(root.frameworks[0].kind, FrameworkType::Marathon);
        let created_by = root.frameworks[1].created_by_deployment.as_ref().unwrap();
        assert_eq!(created_by.kind, DeploymentType::MarathonApp);
        assert_eq!(created_by.name, "chronos");

        assert_eq!(root.deployments.len(), 2);
        let cleanup = &root.deployments[1];
        assert_eq!(cleanup.kind, DeploymentType::ChronosJob);
        assert_eq!(cleanup.dependencies.len(), 1);
        assert!(cleanup.dependencies[0].wait_for_healthy);
        assert_eq!(cleanup.dependency_of.len(), 1);
        assert_eq!(cleanup.dependency_of[0].target_type, "*");
        assert_eq!(cleanup.dependency_of[0].filters.len(), 1);
        assert_eq!(cleanup.dependency_of[0].filters[0].key, "labels");
    }

    #[test]
    fn parse_rejects_unknown_deployment_type() {
        let source = r#"
            [[deployment]]
            type = "nomad_job"
            name = "x"
            deploy = "x.json"
        "#;
        assert!(matches!(
            parse(source, &HashMap::new()),
            Err(ModelError::Parse(_))
        ));
    }

    #[test]
    fn parse_empty_file() {
        let root = parse("", &HashMap::new()).unwrap();
        assert!(root.mesos.is_none());
        assert!(root.frameworks.is_empty());
        assert!(root.deployments.is_empty());
    }
}
