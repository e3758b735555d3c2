//! Definition Validation
//!
//! Storage-time checks on workflow definitions and advisory lints on
//! parsed steps.
//!
//! Step structure is deliberately NOT checked here: a definition whose
//! steps are malformed can still be stored, and fails when executed.

use std::collections::HashSet;

use log::debug;
use thiserror::Error;

use super::model::{Step, StepKind, WorkflowDefinition};

/// Validation error types for user-friendly error messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Definition has empty or whitespace-only name")]
    EmptyName,

    #[error("Definition has no version")]
    EmptyVersion,

    #[error("Definition document is not valid JSON: {0}")]
    InvalidDocument(String),

    #[error("Duplicate step name: '{0}'")]
    DuplicateStepName(String),

    #[error("Condition '{step}' names unknown step '{label}'")]
    UnknownBranch { step: String, label: String },
}

/// Validates a definition before it is stored.
///
/// Performs the following checks:
/// 1. Name is not empty
/// 2. Version is not empty
/// 3. Document is well-formed JSON
pub fn validate_definition(definition: &WorkflowDefinition) -> Result<(), String> {
    let mut errors = Vec::new();

    if definition.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    if definition.version.trim().is_empty() {
        errors.push(ValidationError::EmptyVersion);
    }

    if let Err(e) = serde_json::from_str::<serde_json::Value>(&definition.definition_json) {
        errors.push(ValidationError::InvalidDocument(e.to_string()));
    }

    if !errors.is_empty() {
        let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(error_messages.join("\n"));
    }

    debug!("Definition '{}' v{} validated", definition.name, definition.version);
    Ok(())
}

/// Lints parsed steps and returns warning messages.
///
/// Warnings never block execution and are not logged here; callers
/// decide how to report them. Reported:
/// - duplicate step names
/// - condition branch labels that match no step
pub fn lint_steps(steps: &[Step]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for step in steps {
        if !seen.insert(step.name.as_str()) {
            warnings.push(ValidationError::DuplicateStepName(step.name.clone()));
        }
    }

    for step in steps {
        if let StepKind::Condition {
            true_step,
            false_step,
            ..
        } = &step.kind
        {
            for label in [true_step, false_step] {
                if !seen.contains(label.as_str()) {
                    warnings.push(ValidationError::UnknownBranch {
                        step: step.name.clone(),
                        label: label.clone(),
                    });
                }
            }
        }
    }

    debug!("Lint found {} warnings in {} steps", warnings.len(), steps.len());
    warnings.iter().map(|w| w.to_string()).collect()
}
