//! Result Rendering
//!
//! Formats run and script results for the command line:
//!
//! - `json`: pretty-printed JSON
//! - `yaml`: YAML document
//! - `text`: indented `key: value` layout meant for people
//! - `colored-text`: the text layout with ANSI colours
//!
//! Long or multi-line strings in the text layouts are printed as indented
//! blocks, wrapped at [`WRAP_WIDTH`] characters with a ` ⤵` mark at each
//! break.

use clap::ValueEnum;
use colored::Colorize;
use serde_json::{Map, Value as JsonValue};

use crate::error::EngineError;

/// Longest line of a string block.
pub const WRAP_WIDTH: usize = 100;

const NOTE: &str = "(Note: this output is meant to be human-readable. Use JSON format for parsing.)";
const CONTINUED: &str = " ⤵";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Text,
    ColoredText,
}

/// Renders a result in the given format.
pub fn render(value: &JsonValue, format: OutputFormat) -> Result<String, EngineError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| EngineError::Render(e.to_string()))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| EngineError::Render(e.to_string()))
        }
        OutputFormat::Text => Ok(TextWriter::new(false).render(value)),
        OutputFormat::ColoredText => Ok(TextWriter::new(true).render(value)),
    }
}

fn is_block(text: &str) -> bool {
    text.contains('\n') || text.chars().count() > WRAP_WIDTH
}

/// Splits a line into chunks of at most [`WRAP_WIDTH`] characters.
fn wrap(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(WRAP_WIDTH)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

struct TextWriter {
    colored: bool,
    out: String,
}

impl TextWriter {
    fn new(colored: bool) -> Self {
        if colored {
            // Colours are requested explicitly, even when not writing to a terminal.
            colored::control::set_override(true);
        }
        Self {
            colored,
            out: String::new(),
        }
    }

    fn render(mut self, value: &JsonValue) -> String {
        let note = format!("\n{}\n\n", NOTE);
        if self.colored {
            self.out.push_str(&note.cyan().to_string());
        } else {
            self.out.push_str(&note);
        }

        match value {
            JsonValue::Object(map) => self.write_map(map, 0),
            JsonValue::Array(items) => self.write_list(items, 0),
            JsonValue::String(s) if is_block(s) => self.write_block(s, 0),
            other => {
                let scalar = self.scalar(other);
                self.out.push_str(&scalar);
                self.out.push('\n');
            }
        }
        self.out
    }

    fn key(&self, key: &str) -> String {
        if self.colored {
            key.blue().to_string()
        } else {
            key.to_string()
        }
    }

    fn dash(&self) -> String {
        if self.colored {
            "-".blue().to_string()
        } else {
            "-".to_string()
        }
    }

    fn string(&self, text: &str) -> String {
        if self.colored {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn scalar(&self, value: &JsonValue) -> String {
        let (text, kind) = match value {
            JsonValue::Null => ("None".to_string(), Kind::Constant),
            JsonValue::Bool(true) => ("True".to_string(), Kind::Constant),
            JsonValue::Bool(false) => ("False".to_string(), Kind::Constant),
            JsonValue::Number(n) => (n.to_string(), Kind::Number),
            JsonValue::String(s) if s.is_empty() => ("\"\"".to_string(), Kind::String),
            JsonValue::String(s) => (s.clone(), Kind::String),
            JsonValue::Array(_) => ("[]".to_string(), Kind::Constant),
            JsonValue::Object(_) => ("{}".to_string(), Kind::Constant),
        };

        if !self.colored {
            return text;
        }
        match kind {
            Kind::Constant => text.cyan().to_string(),
            Kind::Number => text.yellow().to_string(),
            Kind::String => text.green().to_string(),
        }
    }

    fn push_line(&mut self, indent: usize, text: &str) {
        self.out.push_str(&" ".repeat(indent));
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn write_map(&mut self, map: &Map<String, JsonValue>, indent: usize) {
        for (key, value) in map {
            let key = self.key(key);
            match value {
                JsonValue::Object(inner) if !inner.is_empty() => {
                    self.push_line(indent, &format!("{}:", key));
                    self.write_map(inner, indent + 2);
                }
                JsonValue::Array(items) if !items.is_empty() => {
                    self.push_line(indent, &format!("{}:", key));
                    self.write_list(items, indent + 2);
                }
                JsonValue::String(s) if is_block(s) => {
                    self.push_line(indent, &format!("{}:", key));
                    self.write_block(s, indent + 2);
                }
                scalar => {
                    let scalar = self.scalar(scalar);
                    self.push_line(indent, &format!("{}: {}", key, scalar));
                }
            }
        }
    }

    fn write_list(&mut self, items: &[JsonValue], indent: usize) {
        let dash = self.dash();
        for item in items {
            match item {
                JsonValue::Object(inner) if !inner.is_empty() => {
                    self.push_line(indent, &dash);
                    self.write_map(inner, indent + 2);
                }
                JsonValue::Array(inner) if !inner.is_empty() => {
                    self.push_line(indent, &dash);
                    self.write_list(inner, indent + 2);
                }
                JsonValue::String(s) if is_block(s) => {
                    self.push_line(indent, &format!("{}⤵", dash));
                    self.write_block(s, indent + 2);
                }
                scalar => {
                    let scalar = self.scalar(scalar);
                    self.push_line(indent, &format!("{} {}", dash, scalar));
                }
            }
        }
    }

    fn write_block(&mut self, text: &str, indent: usize) {
        for line in text.lines() {
            if line.is_empty() {
                self.out.push('\n');
                continue;
            }
            let chunks = wrap(line);
            let last = chunks.len() - 1;
            for (i, chunk) in chunks.iter().enumerate() {
                let mut chunk = self.string(chunk);
                if i < last {
                    chunk.push_str(CONTINUED);
                }
                self.push_line(indent, &chunk);
            }
        }
    }
}

enum Kind {
    Constant,
    Number,
    String,
}
