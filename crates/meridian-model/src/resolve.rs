//! Dependency spec resolution.

use crate::error::{ModelError, ModelResult};
use crate::filter;
use crate::types::{Deployment, DeploymentRef, DeploymentType, DependencySpec, Filter};

/// What a dependency spec's type narrows the candidate set to.
#[derive(Debug, Clone, Copy)]
enum TargetType {
    /// The wildcard `"*"`: every deployment type.
    Any,
    /// A single concrete deployment type.
    Typed(DeploymentType),
}

fn parse_target(raw: &str) -> ModelResult<TargetType> {
    match raw {
        "*" => Ok(TargetType::Any),
        other => other
            .parse::<DeploymentType>()
            .map(TargetType::Typed)
            .map_err(|_| ModelError::UnknownDependencyType(other.to_owned())),
    }
}

/// Expands `spec` into the indices of the deployments it targets, in record
/// order.
///
/// In the named form the spec must resolve to exactly one deployment; zero
/// matches or more than one is an error. In the filtered form any number of
/// matches (including zero) is fine.
pub fn targets(spec: &DependencySpec, deployments: &[Deployment]) -> ModelResult<Vec<usize>> {
    let named = spec.name.as_deref().filter(|name| !name.is_empty());
    let synthesized: [Filter; 1];
    let filters: &[Filter] = if let Some(name) = named {
        if !spec.filters.is_empty() {
            return Err(ModelError::AmbiguousForm);
        }
        if spec.target_type == "*" {
            return Err(ModelError::WildcardWithName);
        }
        synthesized = [Filter::named(name)];
        &synthesized
    } else {
        &spec.filters
    };
    let target = parse_target(&spec.target_type)?;

    let mut matched = Vec::new();
    'records: for (index, deployment) in deployments.iter().enumerate() {
        if let TargetType::Typed(kind) = target {
            if kind != deployment.kind {
                continue;
            }
        }
        for predicate in filters {
            if !filter::matches(predicate, deployment)? {
                continue 'records;
            }
        }
        matched.push(index);
    }

    if let Some(name) = named {
        // The named form was reduced to a concrete type above.
        let target_ref = match target {
            TargetType::Typed(kind) => DeploymentRef::new(kind, name),
            TargetType::Any => unreachable!("wildcard with name rejected above"),
        };
        match matched.len() {
            1 => {}
            0 => return Err(ModelError::NameNotFound(target_ref)),
            _ => return Err(ModelError::NameAmbiguous(target_ref)),
        }
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeploymentType;

    fn deployment(kind: DeploymentType, name: &str, labels: &[&str]) -> Deployment {
        Deployment {
            kind,
            name: name.to_owned(),
            framework: None,
            deploy: format!("{name}.json"),
            labels: labels.iter().map(|&l| l.to_owned()).collect(),
            dependencies: Vec::new(),
            dependency_of: Vec::new(),
        }
    }

    fn records() -> Vec<Deployment> {
        vec![
            deployment(DeploymentType::MarathonApp, "bootstrap", &["b"]),
            deployment(DeploymentType::MarathonApp, "app1", &[]),
            deployment(DeploymentType::ChronosJob, "app2", &[]),
        ]
    }

    fn named_spec(target_type: &str, name: &str) -> DependencySpec {
        DependencySpec {
            target_type: target_type.to_owned(),
            name: Some(name.to_owned()),
            wait_for_healthy: false,
            filters: Vec::new(),
        }
    }

    #[test]
    fn named_form_resolves_to_exactly_one() {
        let resolved = targets(&named_spec("marathon_app", "app1"), &records()).unwrap();
        assert_eq!(resolved, vec![1]);
    }

    #[test]
    fn named_form_respects_type() {
        // app2 exists, but as a chronos_job.
        let result = targets(&named_spec("marathon_app", "app2"), &records());
        assert!(matches!(result, Err(ModelError::NameNotFound(_))));
    }

    #[test]
    fn named_form_missing_target_fails() {
        let result = targets(&named_spec("marathon_app", "ghost"), &records());
        assert!(matches!(
            result,
            Err(ModelError::NameNotFound(target)) if target.name == "ghost"
        ));
    }

    #[test]
    fn named_form_with_duplicate_targets_is_ambiguous() {
        // Duplicate refs are a validation error upstream, but the resolver
        // still refuses to pick one arbitrarily.
        let records = vec![
            deployment(DeploymentType::MarathonApp, "app1", &[]),
            deployment(DeploymentType::MarathonApp, "app1", &[]),
        ];
        assert!(matches!(
            targets(&named_spec("marathon_app", "app1"), &records),
            Err(ModelError::NameAmbiguous(_))
        ));
    }

    #[test]
    fn named_form_with_filters_is_ambiguous() {
        let spec = DependencySpec {
            filters: vec![Filter::named("bootstrap")],
            ..named_spec("marathon_app", "app1")
        };
        assert!(matches!(
            targets(&spec, &records()),
            Err(ModelError::AmbiguousForm)
        ));
    }

    #[test]
    fn named_form_with_wildcard_is_rejected() {
        assert!(matches!(
            targets(&named_spec("*", "app1"), &records()),
            Err(ModelError::WildcardWithName)
        ));
    }

    #[test]
    fn unknown_type_is_rejected_even_with_no_records() {
        let spec = DependencySpec {
            target_type: "frob".to_owned(),
            name: None,
            wait_for_healthy: false,
            filters: Vec::new(),
        };
        assert!(matches!(
            targets(&spec, &[]),
            Err(ModelError::UnknownDependencyType(kind)) if kind == "frob"
        ));
    }

    #[test]
    fn filtered_form_collects_in_record_order() {
        let spec = DependencySpec {
            target_type: "*".to_owned(),
            name: None,
            wait_for_healthy: false,
            filters: Vec::new(),
        };
        assert_eq!(targets(&spec, &records()).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn filtered_form_narrows_by_type() {
        let spec = DependencySpec {
            target_type: "marathon_app".to_owned(),
            name: None,
            wait_for_healthy: false,
            filters: Vec::new(),
        };
        assert_eq!(targets(&spec, &records()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn wildcard_with_negated_label_filter_is_complement() {
        // The bootstrap inverse-dependency shape: everything NOT labelled "b".
        let spec = DependencySpec {
            target_type: "*".to_owned(),
            name: None,
            wait_for_healthy: false,
            filters: vec![Filter {
                key: "labels".to_owned(),
                value: Some("b".to_owned()),
                negate: true,
                ..Filter::default()
            }],
        };
        assert_eq!(targets(&spec, &records()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn filters_are_anded_with_short_circuit() {
        let spec = DependencySpec {
            target_type: "*".to_owned(),
            name: None,
            wait_for_healthy: false,
            filters: vec![
                Filter {
                    glob: true,
                    ..Filter::named("app*")
                },
                Filter {
                    key: "labels".to_owned(),
                    value: Some("b".to_owned()),
                    negate: true,
                    ..Filter::default()
                },
            ],
        };
        assert_eq!(targets(&spec, &records()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn empty_name_is_treated_as_filtered_form() {
        let spec = DependencySpec {
            name: Some(String::new()),
            target_type: "marathon_app".to_owned(),
            wait_for_healthy: false,
            filters: Vec::new(),
        };
        assert_eq!(targets(&spec, &records()).unwrap(), vec![0, 1]);
    }
}
