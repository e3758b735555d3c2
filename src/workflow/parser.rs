//! Definition Parser
//!
//! Converts a raw definition document into an ordered sequence of
//! [`Step`] values, and loads/saves definition files.
//!
//! Parsing is structural only: the document must be a JSON object with a
//! `steps` array whose elements carry a `name` and a `type`. Each known
//! type must also carry its own required fields. Unknown types are not
//! an error; they become [`StepKind::Unrecognized`].

use std::error::Error;
use std::fs;

use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::model::{
    DefinitionStatus, Step, StepKind, WorkflowDefinition, CONDITION, DATA_PROCESSING,
    NOTIFICATION, SCHEDULE_TASK, SERVICE_CALL,
};
use crate::error::EngineError;

/// Parses a definition document into its ordered steps.
///
/// The document is re-parsed on every call; nothing is cached.
///
/// # Errors
///
/// Returns [`EngineError::MalformedDefinition`] when the document is not
/// JSON, has no `steps` array, or contains a step that is missing its
/// name, type tag, or a field its type requires.
///
/// # Example
///
/// ```
/// use stepflow::workflow::parse_definition;
///
/// let steps = parse_definition(r#"{"steps": [
///     {"name": "s1", "type": "service_call", "service": "cbi-service", "endpoint": "/x"}
/// ]}"#).unwrap();
/// assert_eq!(steps[0].name, "s1");
/// ```
pub fn parse_definition(document: &str) -> Result<Vec<Step>, EngineError> {
    let root: Value = serde_json::from_str(document)
        .map_err(|e| malformed(format!("document is not valid JSON: {}", e)))?;

    let root = root
        .as_object()
        .ok_or_else(|| malformed("document must be a JSON object"))?;

    let steps = match root.get("steps") {
        Some(Value::Array(steps)) => steps,
        Some(_) => return Err(malformed("'steps' must be an array")),
        None => return Err(malformed("'steps' is missing")),
    };

    let parsed = steps
        .iter()
        .enumerate()
        .map(|(index, value)| parse_step(index, value))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Parsed {} steps", parsed.len());
    Ok(parsed)
}

fn parse_step(index: usize, value: &Value) -> Result<Step, EngineError> {
    let fields = value
        .as_object()
        .ok_or_else(|| malformed(format!("step #{} is not an object", index)))?;

    let name = match fields.get("name") {
        Some(Value::String(name)) => name.clone(),
        _ => return Err(malformed(format!("step #{} has no 'name'", index))),
    };

    let type_tag = match fields.get("type") {
        Some(Value::String(tag)) => tag.as_str(),
        _ => return Err(malformed(format!("step '{}' has no 'type'", name))),
    };

    let field = |key: &str| required_text(fields, key, &name);

    let kind = match type_tag {
        SERVICE_CALL => StepKind::ServiceCall {
            service: field("service")?,
            endpoint: field("endpoint")?,
        },
        SCHEDULE_TASK => StepKind::ScheduleTask {
            task: field("task")?,
            cron: field("cron")?,
        },
        DATA_PROCESSING => StepKind::DataProcessing {
            processing_type: field("processingType")?,
            batch_size: required_integer(fields, "batchSize", &name)?,
        },
        NOTIFICATION => StepKind::Notification {
            notification_type: field("notificationType")?,
            message: field("message")?,
        },
        CONDITION => StepKind::Condition {
            condition: field("condition")?,
            true_step: field("trueStep")?,
            false_step: field("falseStep")?,
        },
        other => StepKind::Unrecognized {
            type_tag: other.to_string(),
        },
    };

    Ok(Step { name, kind })
}

/// Reads a scalar field as text. Numbers and booleans are accepted and
/// rendered in their JSON form.
fn required_text(fields: &Map<String, Value>, key: &str, step: &str) -> Result<String, EngineError> {
    match fields.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(malformed(format!(
            "step '{}': '{}' must be a string",
            step, key
        ))),
        None => Err(malformed(format!("step '{}' is missing '{}'", step, key))),
    }
}

/// Reads an integer field. Integer-valued strings such as `"100"` are accepted.
fn required_integer(fields: &Map<String, Value>, key: &str, step: &str) -> Result<i64, EngineError> {
    let invalid = || malformed(format!("step '{}': '{}' must be an integer", step, key));

    match fields.get(key) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
        None => Err(malformed(format!("step '{}' is missing '{}'", step, key))),
    }
}

fn malformed(message: impl Into<String>) -> EngineError {
    EngineError::MalformedDefinition(message.into())
}

/// Header fields read from a definition file alongside its steps.
#[derive(Deserialize)]
struct DefinitionHeader {
    name: String,
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: DefinitionStatus,
}

/// Loads a workflow definition from a YAML or JSON file.
///
/// The file holds the definition document itself: `name`, `version`,
/// optional `description` and `status`, and the `steps` array. The
/// document is stored on the definition as canonical JSON. Steps are
/// not validated here; that happens when the workflow executes.
///
/// # Arguments
///
/// * `path` - Path to the definition file
///
/// # Example
///
/// ```rust,no_run
/// use stepflow::workflow::load_definition;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let definition = load_definition("order-intake.yaml")?;
///     println!("Loaded {} v{}", definition.name, definition.version);
///     Ok(())
/// }
/// ```
pub fn load_definition(path: &str) -> Result<WorkflowDefinition, Box<dyn Error>> {
    info!("Loading workflow definition from: {}", path);

    let content = fs::read_to_string(path).map_err(|e| {
        format!(
            "Failed to read definition file '{}': {}. Check that the file exists and is readable.",
            path, e
        )
    })?;

    debug!("Definition content loaded ({} bytes)", content.len());

    // YAML is a superset of JSON, so one parser handles both formats
    let document: Value = serde_yaml::from_str(&content).map_err(|e| {
        format!("Failed to parse definition file: {}. Check the file format.", e)
    })?;

    let header: DefinitionHeader = serde_json::from_value(document.clone())
        .map_err(|e| format!("Definition file is missing required fields: {}", e))?;

    let mut definition =
        WorkflowDefinition::new(header.name, header.version, serde_json::to_string(&document)?)
            .with_status(header.status);
    definition.description = header.description;

    info!("Loaded definition '{}' v{}", definition.name, definition.version);
    Ok(definition)
}

/// Saves a workflow definition to a JSON file.
///
/// The header fields are merged into the document's top-level object so
/// the file can be read back with [`load_definition`].
pub fn save_definition(definition: &WorkflowDefinition, path: &str) -> Result<(), Box<dyn Error>> {
    let mut document: Value = serde_json::from_str(&definition.definition_json)?;

    let object = document
        .as_object_mut()
        .ok_or("Definition document must be a JSON object")?;
    object.insert("name".to_string(), Value::from(definition.name.clone()));
    object.insert("version".to_string(), Value::from(definition.version.clone()));
    object.insert("status".to_string(), serde_json::to_value(definition.status)?);
    if let Some(description) = &definition.description {
        object.insert("description".to_string(), Value::from(description.clone()));
    }

    fs::write(path, serde_json::to_string_pretty(&document)?)?;
    info!("Workflow definition saved to: {}", path);
    Ok(())
}
