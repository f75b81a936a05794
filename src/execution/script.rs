//! Script Step Execution
//!
//! Scripts run as subprocesses and exchange data through two files in a
//! private temporary directory:
//!
//! - `RUNWAY_INPUTS_FILE`: JSON object of resolved inputs, written before
//!   the script starts
//! - `RUNWAY_OUTPUTS_FILE`: created empty; the script writes a JSON object
//!
//! The outputs object becomes the step result. A missing `succeeded` entry is
//! taken from the exit status.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};

use super::result::{is_truthy, ScriptOutcome};
use crate::error::EngineError;
use crate::workflow::Script;

pub const INPUTS_FILE_ENV: &str = "RUNWAY_INPUTS_FILE";
pub const OUTPUTS_FILE_ENV: &str = "RUNWAY_OUTPUTS_FILE";

const DECODE_ERROR: &str = "Failed to decode JSON from outputs file";

/// Programs used to run scripts, keyed by file extension.
pub type Interpreters = IndexMap<String, PathBuf>;

/// Interpreters registered by default, in lookup order.
pub fn default_interpreters() -> Interpreters {
    [("sh", "sh"), ("bash", "bash"), ("py", "python3")]
        .into_iter()
        .map(|(ext, program)| (ext.to_string(), PathBuf::from(program)))
        .collect()
}

fn failed(error: impl Into<String>) -> ScriptOutcome {
    let mut fields = Map::new();
    fields.insert("succeeded".into(), JsonValue::Bool(false));
    fields.insert("error".into(), JsonValue::String(error.into()));
    ScriptOutcome {
        fields,
        output: None,
        error: None,
    }
}

fn non_empty(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Builds the command for a script: its interpreter, or the file itself.
fn script_command(path: &Path, interpreters: &Interpreters) -> Command {
    let interpreter = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| interpreters.get(ext));

    match interpreter {
        Some(program) => {
            let mut cmd = Command::new(program);
            cmd.arg(path);
            cmd
        }
        None => Command::new(path),
    }
}

/// Parses the outputs file.
///
/// Returns `None` when the contents are not a JSON object.
fn read_outputs(path: &Path) -> io::Result<Option<Map<String, JsonValue>>> {
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(Some(Map::new()));
    }
    match serde_json::from_str(&text) {
        Ok(JsonValue::Object(map)) => Ok(Some(map)),
        _ => Ok(None),
    }
}

/// Runs a script with already validated inputs.
///
/// # Arguments
///
/// * `script` - The resolved script
/// * `inputs` - Inputs written to the inputs file
/// * `interpreters` - Programs keyed by extension
/// * `working_dir` - Directory the script runs in
///
/// # Returns
///
/// * `Ok(ScriptOutcome)` - The script ran, or failed to start
/// * `Err` - The exchange files could not be prepared
pub fn run_script(
    script: &Script,
    inputs: &Map<String, JsonValue>,
    interpreters: &Interpreters,
    working_dir: &Path,
) -> Result<ScriptOutcome, EngineError> {
    let exchange = tempfile::tempdir()?;
    let inputs_path = exchange.path().join("inputs.json");
    let outputs_path = exchange.path().join("outputs.json");

    fs::write(&inputs_path, serde_json::to_vec(inputs).map_err(io::Error::from)?)?;
    fs::write(&outputs_path, "")?;

    let mut cmd = script_command(&script.path, interpreters);
    cmd.current_dir(working_dir)
        .env(INPUTS_FILE_ENV, &inputs_path)
        .env(OUTPUTS_FILE_ENV, &outputs_path)
        .stdin(Stdio::null());

    debug!("Running script {}: {:?}", script.name, cmd);

    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => {
            warn!("Failed to start script {}: {}", script.name, e);
            return Ok(failed(format!("Failed to start script {}: {}", script.name, e)));
        }
    };

    let outcome = match read_outputs(&outputs_path)? {
        None => failed(DECODE_ERROR),
        Some(mut fields) => {
            let succeeded = match fields.get("succeeded") {
                Some(value) => is_truthy(value),
                None => output.status.success(),
            };
            fields.insert("succeeded".into(), JsonValue::Bool(succeeded));

            ScriptOutcome {
                fields,
                output: non_empty(&output.stdout),
                error: non_empty(&output.stderr),
            }
        }
    };

    if let Err(e) = exchange.close() {
        warn!("Failed to clean up script exchange directory: {}", e);
    }

    Ok(outcome)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::workflow::ScriptMetadata;
    use serde_json::json;
    use tempfile::tempdir;

    fn script(dir: &Path, body: &str) -> Script {
        let path = dir.join("test.sh");
        fs::write(&path, body).unwrap();
        Script {
            name: "test".into(),
            path,
            metadata: ScriptMetadata::default(),
        }
    }

    fn run(body: &str, inputs: JsonValue) -> JsonValue {
        let dir = tempdir().unwrap();
        let script = script(dir.path(), body);
        let outcome = run_script(
            &script,
            inputs.as_object().unwrap(),
            &default_interpreters(),
            dir.path(),
        )
        .unwrap();
        crate::execution::StepResult::Script(outcome).to_json()
    }

    #[test]
    fn test_empty_script_succeeds() {
        assert_eq!(run("", json!({})), json!({"succeeded": true}));
    }

    #[test]
    fn test_exit_status_decides_success() {
        assert_eq!(run("exit 2", json!({})), json!({"succeeded": false}));
    }

    #[test]
    fn test_outputs_and_streams() {
        let body = r#"
printf 'out'
printf 'err' >&2
echo '{"value": 42, "changed": true}' > "$RUNWAY_OUTPUTS_FILE"
"#;
        assert_eq!(
            run(body, json!({})),
            json!({"value": 42, "changed": true, "succeeded": true, "output": "out", "error": "err"})
        );
    }

    #[test]
    fn test_inputs_file() {
        let body = r#"cat "$RUNWAY_INPUTS_FILE""#;
        let result = run(body, json!({"name": "world"}));
        assert_eq!(result["output"], json!(r#"{"name":"world"}"#));
    }

    #[test]
    fn test_script_reported_failure_wins() {
        let body = r#"echo '{"succeeded": false, "error": "bad input"}' > "$RUNWAY_OUTPUTS_FILE""#;
        assert_eq!(run(body, json!({})), json!({"succeeded": false, "error": "bad input"}));
    }

    #[test]
    fn test_invalid_outputs() {
        let expected = json!({"succeeded": false, "error": DECODE_ERROR});
        assert_eq!(run(r#"echo 'not a json' > "$RUNWAY_OUTPUTS_FILE""#, json!({})), expected);
        assert_eq!(run(r#"echo '[1, 2]' > "$RUNWAY_OUTPUTS_FILE""#, json!({})), expected);
    }

    #[test]
    fn test_script_runs_in_working_dir() {
        let result = run("ls", json!({}));
        assert_eq!(result["output"], json!("test.sh\n"));
    }
}
