use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fmt::{self, Display};
use thiserror::Error;

/// Umbrella error for the text-level entry points in [`crate::api`].
#[derive(Error, Debug, Diagnostic)]
pub enum FsonError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("Unexpected token")]
    #[diagnostic(
        code(parser::unexpected_token),
        help("The parser found a token it did not expect in this position.")
    )]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected}, but found this")]
        span: SourceSpan,
        expected: String,
    },

    #[error("Unexpected end of input")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("The input ended unexpectedly. The parser expected more tokens.")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("Input ended unexpectedly here")]
        span: SourceSpan,
    },

    #[error("Invalid literal: {reason}")]
    #[diagnostic(
        code(parser::invalid_literal),
        help("Strings must be closed and use JSON escapes; numbers must follow the JSON number grammar.")
    )]
    InvalidLiteral {
        #[source_code]
        src: NamedSource<String>,
        #[label("{reason}")]
        span: SourceSpan,
        reason: String,
    },

    #[error("Nesting deeper than {limit} levels")]
    #[diagnostic(code(parser::nesting_too_deep))]
    NestingTooDeep {
        #[source_code]
        src: NamedSource<String>,
        #[label("Nesting limit exceeded here")]
        span: SourceSpan,
        limit: usize,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CodecError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    #[diagnostic(
        code(codec::type_mismatch),
        help("The JSON shape or value does not match the declared storage type.")
    )]
    TypeMismatch { expected: String, found: String },

    #[error("Type `{type_name}` is not serializable: {reason}")]
    #[diagnostic(code(codec::not_serializable))]
    NotSerializable { type_name: String, reason: String },

    #[error("No converter found for `{type_name}`")]
    #[diagnostic(
        code(codec::no_converter_found),
        help("Register a converter with this name, or remove the member's converter override.")
    )]
    NoConverterFound { type_name: String },

    #[error("Reference `{id}` has no matching definition")]
    #[diagnostic(
        code(codec::dangling_reference),
        help("A `$ref` appeared before the `$id` it points to; the data may have been reordered or edited by hand.")
    )]
    DanglingReference { id: u64 },

    #[error("Unknown type `{name}`")]
    #[diagnostic(
        code(codec::unknown_type),
        help("Register the type with the TypeRegistry before converting values of it.")
    )]
    UnknownType { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    MalformedInput(#[from] ParserError),

    #[error("{type_name}.{member}: {source}")]
    #[diagnostic(code(codec::member))]
    Member {
        type_name: String,
        member: String,
        source: Box<CodecError>,
    },

    #[error("{count} conversion errors", count = .errors.len())]
    #[diagnostic(code(codec::multiple))]
    Multiple {
        #[related]
        errors: Vec<CodecError>,
    },
}

impl CodecError {
    pub fn mismatch(expected: impl Display, found: impl Display) -> Self {
        CodecError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn not_serializable(type_name: impl Display, reason: impl Into<String>) -> Self {
        CodecError::NotSerializable {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Adds member context. Applied to each error of a `Multiple`, so the
    /// failures stay separate.
    pub fn in_member(self, type_name: &str, member: &str) -> Self {
        match self {
            CodecError::Multiple { errors } => CodecError::Multiple {
                errors: errors
                    .into_iter()
                    .map(|e| e.in_member(type_name, member))
                    .collect(),
            },
            other => CodecError::Member {
                type_name: type_name.to_string(),
                member: member.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Splits `Multiple` into its leaves; any other error is returned as-is.
    pub fn flatten(self) -> Vec<CodecError> {
        match self {
            CodecError::Multiple { errors } => {
                errors.into_iter().flat_map(CodecError::flatten).collect()
            }
            other => vec![other],
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid JSON configuration: {0}")]
    #[diagnostic(code(config::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML configuration: {0}")]
    #[diagnostic(code(config::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

/// Collects failures from independent steps so that one failing member
/// does not hide the others.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<CodecError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<T>(&mut self, result: Result<T, CodecError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    pub fn push(&mut self, error: CodecError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(mut self) -> Result<(), CodecError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(CodecError::Multiple {
                errors: self.errors,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Warning(String),
    Error(CodecError),
}

impl Message {
    pub fn is_error(&self) -> bool {
        matches!(self, Message::Error(_))
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Warning(text) => write!(f, "warning: {text}"),
            Message::Error(err) => write!(f, "error: {err}"),
        }
    }
}

/// The result of one top-level codec call.
///
/// Carries the converted value (absent when the call failed) together with
/// every warning and failure recorded along the way. `failed()` is true iff
/// at least one hard failure was recorded.
#[derive(Debug)]
pub struct Outcome<T> {
    value: Option<T>,
    messages: Vec<Message>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(result: Result<T, CodecError>, warnings: Vec<String>) -> Self {
        let mut messages: Vec<Message> = warnings.into_iter().map(Message::Warning).collect();
        let value = match result {
            Ok(value) => Some(value),
            Err(err) => {
                messages.extend(err.flatten().into_iter().map(Message::Error));
                None
            }
        };
        Self { value, messages }
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.messages.iter().any(Message::is_error)
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.failed()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.messages.iter().any(|m| !m.is_error())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().filter_map(|m| match m {
            Message::Warning(text) => Some(text.as_str()),
            Message::Error(_) => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &CodecError> {
        self.messages.iter().filter_map(|m| match m {
            Message::Error(err) => Some(err),
            Message::Warning(_) => None,
        })
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Converts into a plain `Result`, dropping warnings.
    ///
    /// # Errors
    /// Returns the recorded failure, or `CodecError::Multiple` when more than one was recorded.
    pub fn into_result(self) -> Result<T, CodecError> {
        let mut errors: Vec<CodecError> = self
            .messages
            .into_iter()
            .filter_map(|m| match m {
                Message::Error(err) => Some(err),
                Message::Warning(_) => None,
            })
            .collect();
        match (self.value, errors.len()) {
            (Some(value), 0) => Ok(value),
            (_, 1) => Err(errors.remove(0)),
            (_, _) => Err(CodecError::Multiple { errors }),
        }
    }
}
