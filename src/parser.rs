//! Parser registry: turns fetched bytes into a value tree.
//!
//! The YAML/JSON parser covers `.yaml`, `.yml`, and `.json` with a
//! JSON-compatible YAML schema (non-string keys and custom tags are
//! rejected). Text and binary parsers pass contents through as string
//! values. Selection follows the resolver discipline: matching parsers by
//! `order`, then every parser as a fallback when none matched.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, ParserError};
use crate::options::{Options, ParserConfig};
use crate::resolver::FileDescriptor;

const YAML_EXTENSIONS: &[&str] = &[".yaml", ".yml", ".json"];
const TEXT_EXTENSIONS: &[&str] = &[".txt", ".md", ".html", ".htm", ".xml", ".csv"];
const BINARY_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ico", ".pdf"];

/// A caller-supplied parser.
#[derive(Debug, Clone, Copy)]
pub struct CustomParser {
    /// Position in the registry; lower runs first.
    pub order: i32,
    /// Whether a zero-byte document is acceptable.
    pub allow_empty: bool,
    /// Whether this parser wants the file.
    pub can_parse: fn(&FileDescriptor) -> bool,
    /// Turn the file's bytes into a value.
    pub parse: fn(&FileDescriptor) -> Result<Value, ParserError>,
}

#[derive(Clone, Copy)]
enum Builtin {
    Yaml,
    Text,
    Binary,
}

enum Candidate<'a> {
    Builtin(Builtin, ParserConfig),
    Custom(&'a CustomParser),
}

impl Candidate<'_> {
    fn order(&self) -> i32 {
        match self {
            Candidate::Builtin(_, config) => config.order,
            Candidate::Custom(custom) => custom.order,
        }
    }

    fn allow_empty(&self) -> bool {
        match self {
            Candidate::Builtin(_, config) => config.allow_empty,
            Candidate::Custom(custom) => custom.allow_empty,
        }
    }

    fn matches(&self, file: &FileDescriptor) -> bool {
        match self {
            Candidate::Builtin(Builtin::Yaml, _) => YAML_EXTENSIONS.contains(&&*file.extension),
            Candidate::Builtin(Builtin::Text, _) => TEXT_EXTENSIONS.contains(&&*file.extension),
            Candidate::Builtin(Builtin::Binary, _) => BINARY_EXTENSIONS.contains(&&*file.extension),
            Candidate::Custom(custom) => (custom.can_parse)(file),
        }
    }

    fn run(&self, file: &FileDescriptor) -> Result<Value, ParserError> {
        if file.data.is_empty() {
            if !self.allow_empty() {
                return Err(ParserError::Empty);
            }
            match self {
                Candidate::Builtin(Builtin::Yaml, _) => return Ok(Value::Null),
                Candidate::Builtin(_, _) => return Ok(Value::String(String::new())),
                Candidate::Custom(_) => {} // custom parsers decide for themselves
            }
        }
        match self {
            Candidate::Builtin(Builtin::Yaml, _) => parse_yaml(file),
            Candidate::Builtin(Builtin::Text, _) => parse_text(file),
            Candidate::Builtin(Builtin::Binary, _) => Ok(parse_binary(file)),
            Candidate::Custom(custom) => (custom.parse)(file),
        }
    }
}

/// Parse the descriptor's bytes through the registry.
///
/// # Errors
///
/// The last matching parser's failure wrapped with the URL, or
/// [`Error::UnmatchedParser`] when nothing matched and the fallback pass
/// failed too.
pub(crate) fn parse(file: &FileDescriptor, options: &Options) -> Result<Value, Error> {
    let mut candidates = vec![
        Candidate::Builtin(Builtin::Yaml, options.parse.yaml),
        Candidate::Builtin(Builtin::Text, options.parse.text),
        Candidate::Builtin(Builtin::Binary, options.parse.binary),
    ];
    candidates.extend(options.parse.custom.iter().map(Candidate::Custom));
    candidates.sort_by_key(|c| c.order());

    let matched: Vec<&Candidate> = candidates.iter().filter(|c| c.matches(file)).collect();
    let fallback = matched.is_empty();
    let attempts: Vec<&Candidate> = if fallback {
        candidates.iter().collect()
    } else {
        matched
    };

    let mut last_error = None;
    for candidate in attempts {
        match candidate.run(file) {
            Ok(value) => {
                debug!(url = %file.url, order = candidate.order(), "parsed");
                return Ok(value);
            }
            Err(err) => {
                debug!(url = %file.url, order = candidate.order(), error = %err, "parser failed");
                last_error = Some(err);
            }
        }
    }

    if fallback {
        Err(Error::UnmatchedParser {
            url: file.url.to_string(),
        })
    } else {
        Err(Error::Parser {
            url: file.url.to_string(),
            source: last_error.expect("at least one parser ran"),
        })
    }
}

fn parse_yaml(file: &FileDescriptor) -> Result<Value, ParserError> {
    if file.extension == ".json" {
        serde_json::from_slice(&file.data).map_err(|source| ParserError::Json { source })
    } else {
        // Deserializing straight into a JSON value enforces the
        // JSON-compatible schema: non-string keys and custom tags fail.
        serde_yaml::from_slice(&file.data).map_err(|source| ParserError::Yaml { source })
    }
}

fn parse_text(file: &FileDescriptor) -> Result<Value, ParserError> {
    String::from_utf8(file.data.clone())
        .map(Value::String)
        .map_err(|_| ParserError::Utf8)
}

fn parse_binary(file: &FileDescriptor) -> Value {
    Value::String(String::from_utf8_lossy(&file.data).into_owned())
}
