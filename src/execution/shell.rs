//! Shell Step Execution
//!
//! Runs the command lines of a `run` step, one after another, through the
//! configured shell:
//!
//! - every command runs in the base path with the step's extra `env`
//! - a `stdin` parameter is one stream shared by all commands, so text read
//!   by one command is gone for the next
//! - the first non-zero exit stops the remaining commands

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use log::{debug, warn};
use once_cell::sync::Lazy;
use serde_json::{Map, Value as JsonValue};

use super::result::ShellOutcome;
use crate::error::EngineError;
use crate::expression::Value;

/// Exit code reported when the shell itself cannot be started.
const SPAWN_FAILURE_CODE: i32 = 127;

/// Shell used when none is configured: `RUNWAY_SHELL`, else the platform
/// default.
pub static DEFAULT_SHELL: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(shell) = std::env::var_os("RUNWAY_SHELL").filter(|s| !s.is_empty()) {
        debug!("Using shell from RUNWAY_SHELL: {:?}", shell);
        return PathBuf::from(shell);
    }
    if cfg!(windows) {
        PathBuf::from("cmd")
    } else {
        PathBuf::from("sh")
    }
});

/// How command lines are handed to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Shell program
    pub program: PathBuf,
    /// Argument preceding the command line (`-c` or `/C`)
    pub flag: String,
    /// Directory commands run in
    pub working_dir: PathBuf,
}

impl ShellConfig {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let program = DEFAULT_SHELL.clone();
        let flag = default_flag(&program).to_string();
        Self {
            program,
            flag,
            working_dir: working_dir.into(),
        }
    }

    /// Replaces the shell program, picking the matching command flag.
    pub fn set_program(&mut self, program: impl Into<PathBuf>) {
        self.program = program.into();
        self.flag = default_flag(&self.program).to_string();
    }
}

fn default_flag(program: &Path) -> &'static str {
    let name = program
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if name == "cmd" {
        "/C"
    } else {
        "-c"
    }
}

/// Parameters accepted in a `run` step's `with` mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellParams {
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
}

/// Renders a parameter value as text for the environment or stdin.
fn as_text(value: &JsonValue) -> String {
    Value::from_json(value).to_string()
}

impl ShellParams {
    /// Reads `env` and `stdin`. Any other key is rejected.
    pub fn from_with(with: &Map<String, JsonValue>) -> Result<Self, EngineError> {
        let mut params = Self::default();

        for (key, value) in with {
            match key.as_str() {
                "env" => match value {
                    JsonValue::Object(entries) => {
                        params.env = entries
                            .iter()
                            .map(|(name, value)| (name.clone(), as_text(value)))
                            .collect();
                    }
                    JsonValue::Null => {}
                    _ => return Err(EngineError::InvalidShellInput("env".to_string())),
                },
                "stdin" => {
                    if !value.is_null() {
                        params.stdin = Some(as_text(value));
                    }
                }
                other => return Err(EngineError::InvalidShellInput(other.to_string())),
            }
        }

        Ok(params)
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Writes stdin text to an unnamed temporary file and rewinds it.
fn stdin_file(text: &str) -> Result<File, EngineError> {
    let mut file = tempfile::tempfile()?;
    file.write_all(text.as_bytes())?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}

/// Runs command lines in order.
///
/// # Arguments
///
/// * `commands` - Command lines, each handed to the shell as-is
/// * `params` - Extra environment and stdin
/// * `config` - Shell program and working directory
///
/// # Returns
///
/// * `Ok(ShellOutcome)` - The commands ran (successfully or not)
/// * `Err` - The stdin stream could not be prepared
pub fn run_commands(
    commands: &[String],
    params: &ShellParams,
    config: &ShellConfig,
) -> Result<ShellOutcome, EngineError> {
    let stdin = params.stdin.as_deref().map(stdin_file).transpose()?;

    let mut outcome = ShellOutcome {
        succeeded: true,
        output: String::new(),
        error: String::new(),
        returncode: 0,
    };

    for command in commands {
        debug!("Running: {}", command);

        let mut cmd = Command::new(&config.program);
        cmd.arg(&config.flag)
            .arg(command)
            .current_dir(&config.working_dir)
            .envs(params.env.iter().map(|(k, v)| (k, v)));

        match &stdin {
            Some(file) => cmd.stdin(Stdio::from(file.try_clone()?)),
            None => cmd.stdin(Stdio::null()),
        };

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to start {}: {}", config.program.display(), e);
                outcome.succeeded = false;
                outcome.returncode = SPAWN_FAILURE_CODE;
                outcome.error.push_str(&format!(
                    "Failed to start {}: {}\n",
                    config.program.display(),
                    e
                ));
                break;
            }
        };

        outcome.output.push_str(&String::from_utf8_lossy(&output.stdout));
        outcome.error.push_str(&String::from_utf8_lossy(&output.stderr));
        outcome.returncode = exit_code(output.status);

        if !output.status.success() {
            debug!("Command exited with code {}", outcome.returncode);
            outcome.succeeded = false;
            break;
        }
    }

    Ok(outcome)
}

/// Runs a single command line with no extra environment or stdin.
///
/// Never fails: problems starting the command are reported in the outcome.
pub fn run_command(command: &str, config: &ShellConfig) -> ShellOutcome {
    let commands = [command.to_string()];
    match run_commands(&commands, &ShellParams::default(), config) {
        Ok(outcome) => outcome,
        Err(e) => ShellOutcome {
            succeeded: false,
            output: String::new(),
            error: e.to_string(),
            returncode: SPAWN_FAILURE_CODE,
        },
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn config(dir: &Path) -> ShellConfig {
        let mut config = ShellConfig::new(dir);
        config.set_program("sh");
        config
    }

    fn commands(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_params_from_with() {
        let with = json!({"env": {"NAME": "x", "COUNT": 3, "FLAG": true}, "stdin": "data"});
        let params = ShellParams::from_with(with.as_object().unwrap()).unwrap();
        assert_eq!(
            params.env,
            vec![
                ("NAME".to_string(), "x".to_string()),
                ("COUNT".to_string(), "3".to_string()),
                ("FLAG".to_string(), "True".to_string()),
            ]
        );
        assert_eq!(params.stdin.as_deref(), Some("data"));
    }

    #[test]
    fn test_params_reject_unknown_keys() {
        let with = json!({"cwd": "/tmp"});
        let err = ShellParams::from_with(with.as_object().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input for shell script: cwd");
    }

    #[test]
    fn test_stdin_is_consumed_once() {
        let dir = tempdir().unwrap();
        let params = ShellParams {
            env: Vec::new(),
            stdin: Some("X\n".into()),
        };
        let outcome = run_commands(&commands(&["cat", "echo hi", "cat"]), &params, &config(dir.path())).unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.output, "X\nhi\n");
        assert_eq!(outcome.returncode, 0);
    }

    #[test]
    fn test_first_failure_stops() {
        let dir = tempdir().unwrap();
        let outcome = run_commands(
            &commands(&["echo before", "echo oops >&2; exit 3", "echo after"]),
            &ShellParams::default(),
            &config(dir.path()),
        )
        .unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(outcome.returncode, 3);
        assert_eq!(outcome.output, "before\n");
        assert_eq!(outcome.error, "oops\n");
    }

    #[test]
    fn test_env_and_working_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let params = ShellParams {
            env: vec![("GREETING".into(), "hello".into())],
            stdin: None,
        };
        let outcome = run_commands(&commands(&["echo $GREETING", "ls"]), &params, &config(dir.path())).unwrap();
        assert_eq!(outcome.output, "hello\nmarker.txt\n");
    }

    #[test]
    fn test_missing_shell_is_a_failed_outcome() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.set_program("/nonexistent/shell");

        let outcome = run_command("true", &config);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.returncode, SPAWN_FAILURE_CODE);
    }

    #[test]
    fn test_default_flag() {
        assert_eq!(default_flag(Path::new("/bin/bash")), "-c");
        assert_eq!(default_flag(Path::new("cmd.exe")), "/C");
    }
}
