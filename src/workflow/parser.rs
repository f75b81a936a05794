//! Workflow Parser
//!
//! Handles locating and parsing workflow and script definitions under a
//! base path:
//!
//! - workflows live in `workflows/<name>.yml` (or `.yaml`)
//! - scripts live in `scripts/<name>`, optionally with an interpreter
//!   extension, and may carry a metadata header:
//!
//! ```text
//! #!/bin/sh
//! # /// runway
//! # inputs:
//! #   target:
//! #     type: str
//! # outputs:
//! #   changed:
//! #     type: bool
//! # ///
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::Value as JsonValue;

use super::model::{InputSchema, Script, ScriptMetadata, Step, Workflow, WorkflowDefinition};
use super::validator::validate_workflow;
use crate::error::EngineError;

const WORKFLOW_EXTENSIONS: [&str; 2] = ["yml", "yaml"];
const METADATA_START: &str = "# /// runway";
const METADATA_END: &str = "# ///";

/// Parses an input schema, rejecting unknown type names.
pub fn parse_schema(value: JsonValue) -> Result<InputSchema, String> {
    if value.is_null() {
        return Ok(InputSchema::new());
    }
    serde_json::from_value(value).map_err(|e| format!("Invalid input schema: {}", e))
}

/// Parses workflow YAML.
///
/// # Arguments
///
/// * `name` - Name the workflow is known by
/// * `source` - YAML text; an empty document is an empty workflow
///
/// # Example
///
/// ```
/// use runway::workflow::parse_workflow;
///
/// let workflow = parse_workflow("hello", "steps:\n  - run: echo hello\n").unwrap();
/// assert_eq!(workflow.steps[0].id, "0");
/// ```
pub fn parse_workflow(name: &str, source: &str) -> Result<Workflow, EngineError> {
    let invalid = |message: String| EngineError::InvalidWorkflow {
        name: name.to_string(),
        message,
    };

    let document: JsonValue = serde_yaml::from_str(source).map_err(|e| invalid(e.to_string()))?;
    let definition: WorkflowDefinition = match document {
        JsonValue::Null => WorkflowDefinition::default(),
        other => serde_json::from_value(other).map_err(|e| invalid(e.to_string()))?,
    };

    if let Some(title) = &definition.name {
        debug!("Workflow '{}' is titled '{}'", name, title);
    }
    if let Some(description) = &definition.description {
        debug!("Workflow '{}': {}", name, description);
    }

    let inputs = parse_schema(definition.inputs.unwrap_or(JsonValue::Null)).map_err(invalid)?;

    let steps = definition
        .steps
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, step)| Step::from_definition(index, step))
        .collect::<Result<Vec<_>, _>>()?;

    let workflow = Workflow {
        name: name.to_string(),
        inputs,
        steps,
    };
    validate_workflow(&workflow)?;

    Ok(workflow)
}

/// Finds the file for a named workflow.
pub fn resolve_workflow(base_path: &Path, name: &str) -> Result<PathBuf, EngineError> {
    let dir = base_path.join("workflows");
    WORKFLOW_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
        .ok_or_else(|| EngineError::WorkflowNotFound(name.to_string()))
}

/// Loads a workflow by name.
///
/// # Returns
///
/// * `Ok(Workflow)` - Parsed and validated workflow
/// * `Err` - Not found, unreadable, or malformed
pub fn load_workflow(base_path: &Path, name: &str) -> Result<Workflow, EngineError> {
    let path = resolve_workflow(base_path, name)?;
    info!("Loading workflow from: {}", path.display());

    let source = fs::read_to_string(&path)?;
    debug!("YAML content loaded ({} bytes)", source.len());

    let workflow = parse_workflow(name, &source)?;
    info!("Parsed {} steps", workflow.steps.len());
    Ok(workflow)
}

/// Extracts the YAML text of a script's metadata header, if it has one.
///
/// `Err` carries a description of a header that is opened but never closed.
fn metadata_block(source: &str) -> Result<Option<String>, String> {
    let mut lines = source.lines();
    if !lines.any(|line| line.trim_end() == METADATA_START) {
        return Ok(None);
    }

    let mut yaml = String::new();
    for line in lines {
        let line = line.trim_end();
        if line == METADATA_END {
            return Ok(Some(yaml));
        }
        let content = line
            .strip_prefix("# ")
            .or_else(|| line.strip_prefix('#'))
            .ok_or_else(|| format!("header line is not a comment: {}", line))?;
        yaml.push_str(content);
        yaml.push('\n');
    }

    Err(format!("header is missing its closing `{}` line", METADATA_END))
}

/// Parses the metadata header of a script. A script without a header has
/// empty schemas.
pub fn parse_script_metadata(name: &str, source: &str) -> Result<ScriptMetadata, EngineError> {
    let invalid = |message: String| EngineError::InvalidScriptMetadata {
        name: name.to_string(),
        message,
    };

    let yaml = match metadata_block(source).map_err(invalid)? {
        Some(yaml) => yaml,
        None => return Ok(ScriptMetadata::default()),
    };

    let document: JsonValue = serde_yaml::from_str(&yaml).map_err(|e| invalid(e.to_string()))?;
    match document {
        JsonValue::Null => Ok(ScriptMetadata::default()),
        other => serde_json::from_value(other)
            .map_err(|e| invalid(format!("Invalid input schema: {}", e))),
    }
}

/// Finds the file for a named script.
///
/// `scripts/<name>` is used when it exists; otherwise each extension is
/// tried in order.
pub fn resolve_script<'a, I>(base_path: &Path, name: &str, extensions: I) -> Result<PathBuf, EngineError>
where
    I: IntoIterator<Item = &'a str>,
{
    let dir = base_path.join("scripts");
    let exact = dir.join(name);
    if exact.is_file() {
        return Ok(exact);
    }

    extensions
        .into_iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
        .ok_or_else(|| EngineError::ScriptNotFound(name.to_string()))
}

/// Loads a script by name and reads its metadata header.
pub fn load_script<'a, I>(base_path: &Path, name: &str, extensions: I) -> Result<Script, EngineError>
where
    I: IntoIterator<Item = &'a str>,
{
    let path = resolve_script(base_path, name, extensions)?;
    debug!("Resolved script {} to {}", name, path.display());

    let bytes = fs::read(&path)?;
    let metadata = parse_script_metadata(name, &String::from_utf8_lossy(&bytes))?;

    Ok(Script {
        name: name.to_string(),
        path,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{Action, InputType};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_workflow() {
        let workflow = parse_workflow("empty", "").unwrap();
        assert!(workflow.is_empty());
        assert!(workflow.inputs.is_empty());

        let workflow = parse_workflow("comments", "# nothing here\n").unwrap();
        assert!(workflow.is_empty());
    }

    #[test]
    fn test_parse_workflow_steps_and_inputs() {
        let yaml = r#"
name: Deploy
inputs:
  target:
    type: str
  retries:
    type: int
    default: 2
steps:
  - name: check
    run:
      - echo one
      - echo two
  - do: install
    with:
      packages: [git]
  - py: outputs['x'] = 1
    if: changed('check')
"#;
        let workflow = parse_workflow("deploy", yaml).unwrap();
        assert_eq!(workflow.name, "deploy");
        assert_eq!(workflow.inputs["retries"].kind, InputType::Int);
        assert_eq!(workflow.inputs["retries"].default, Some(json!(2)));

        let ids: Vec<&str> = workflow.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["check", "1", "2"]);
        assert_eq!(
            workflow.steps[0].action,
            Action::Shell(vec!["echo one".into(), "echo two".into()])
        );
        assert_eq!(workflow.steps[1].with["packages"], json!(["git"]));
        assert!(workflow.steps[2].condition.is_some());
    }

    #[test]
    fn test_parse_workflow_errors() {
        let err = parse_workflow("bad", "inputs:\n  x:\n    type: complex\n").unwrap_err();
        assert!(err.to_string().contains("Invalid input schema"));

        let err = parse_workflow("bad", "steps:\n  - run: a\n    do: b\n").unwrap_err();
        assert!(matches!(err, EngineError::InvalidStep { .. }));

        let err = parse_workflow("bad", "steps:\n  - id: a\n    run: x\n  - id: a\n    run: y\n").unwrap_err();
        assert_eq!(err.to_string(), "Duplicate step ID: a");

        assert!(parse_workflow("bad", "unknown: 1\n").is_err());
        assert!(parse_workflow("bad", "steps: [\n").is_err());
    }

    #[test]
    fn test_load_workflow_extensions() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("workflows")).unwrap();
        fs::write(dir.path().join("workflows/short.yml"), "steps: []\n").unwrap();
        fs::write(dir.path().join("workflows/long.yaml"), "steps: []\n").unwrap();

        assert!(load_workflow(dir.path(), "short").is_ok());
        assert!(load_workflow(dir.path(), "long").is_ok());

        let err = load_workflow(dir.path(), "missing").unwrap_err();
        assert_eq!(err.to_string(), "Workflow missing not found");
    }

    #[test]
    fn test_script_metadata() {
        let source = "#!/bin/sh\n# /// runway\n# inputs:\n#   name:\n#     type: str\n#     required: false\n# outputs:\n#   greeting:\n#     type: str\n# ///\necho hi\n";
        let metadata = parse_script_metadata("greet", source).unwrap();
        assert!(!metadata.inputs["name"].required);
        assert_eq!(metadata.outputs["greeting"].kind, InputType::Str);

        let metadata = parse_script_metadata("plain", "echo hi\n").unwrap();
        assert_eq!(metadata, ScriptMetadata::default());

        assert!(parse_script_metadata("open", "# /// runway\n# inputs: {}\n").is_err());
        assert!(parse_script_metadata("typo", "# /// runway\n# inptus: {}\n# ///\n").is_err());
    }

    #[test]
    fn test_resolve_script() {
        let dir = tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        fs::create_dir(&scripts).unwrap();
        fs::write(scripts.join("exact"), "").unwrap();
        fs::write(scripts.join("tool.py"), "").unwrap();
        fs::write(scripts.join("both.sh"), "").unwrap();
        fs::write(scripts.join("both.py"), "").unwrap();

        let extensions = ["sh", "py"];
        assert_eq!(resolve_script(dir.path(), "exact", extensions).unwrap(), scripts.join("exact"));
        assert_eq!(resolve_script(dir.path(), "tool", extensions).unwrap(), scripts.join("tool.py"));
        assert_eq!(resolve_script(dir.path(), "both", extensions).unwrap(), scripts.join("both.sh"));

        let err = resolve_script(dir.path(), "nope", extensions).unwrap_err();
        assert_eq!(err.to_string(), "Script nope not found");
    }
}
