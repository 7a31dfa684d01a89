//! Pre-build validation of a parsed configuration.

use std::collections::HashSet;

use crate::error::{ModelError, ModelResult};
use crate::types::{is_valid_identifier, FrameworkRef, Root};

/// Validates a parsed configuration before graph construction.
///
/// Checks that framework and deployment names are valid identifiers, that
/// refs are unique, that every deployment references a declared framework of
/// the matching type, and that `created_by_deployment` blocks reference
/// declared deployments.
pub fn validate(root: &Root) -> ModelResult<()> {
    let mut frameworks = HashSet::with_capacity(root.frameworks.len());
    for framework in &root.frameworks {
        if !is_valid_identifier(&framework.name) {
            return Err(ModelError::InvalidName {
                kind: "framework",
                name: framework.name.clone(),
            });
        }
        if !frameworks.insert(framework.to_ref()) {
            return Err(ModelError::DuplicateFramework(framework.to_ref()));
        }
    }

    let mut deployments = HashSet::with_capacity(root.deployments.len());
    for deployment in &root.deployments {
        if !is_valid_identifier(&deployment.name) {
            return Err(ModelError::InvalidName {
                kind: "deployment",
                name: deployment.name.clone(),
            });
        }
        if !deployments.insert(deployment.to_ref()) {
            return Err(ModelError::DuplicateDeployment(deployment.to_ref()));
        }
        let framework = FrameworkRef::new(
            deployment.kind.framework(),
            deployment.framework_name().to_owned(),
        );
        if !frameworks.contains(&framework) {
            return Err(ModelError::MissingFramework {
                framework,
                deployment: deployment.to_ref(),
            });
        }
    }

    for framework in &root.frameworks {
        if let Some(creator) = &framework.created_by_deployment {
            if !deployments.contains(creator) {
                return Err(ModelError::UnknownCreatedBy {
                    framework: framework.to_ref(),
                    deployment: creator.clone(),
                });
            }
        }
    }
    Ok(())
}
