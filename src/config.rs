use crate::error::ConfigError;
use crate::utils::{to_camel_case, to_kebab_case, to_pascal_case, to_snake_case};
use serde::{Deserialize, Serialize};

/// How a member's wire name is derived from its identifier when no explicit
/// wire name is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    #[default]
    Identity,
    CamelCase,
    PascalCase,
    SnakeCase,
    KebabCase,
}

impl NamingPolicy {
    pub fn apply(self, ident: &str) -> String {
        match self {
            NamingPolicy::Identity => ident.to_string(),
            NamingPolicy::CamelCase => to_camel_case(ident),
            NamingPolicy::PascalCase => to_pascal_case(ident),
            NamingPolicy::SnakeCase => to_snake_case(ident),
            NamingPolicy::KebabCase => to_kebab_case(ident),
        }
    }
}

/// Which declared members take part in structural conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberSerialization {
    /// Public members, plus non-public members that opted in.
    #[default]
    Default,
    /// Only members that opted in.
    OptIn,
    /// Every member that is not ignored.
    OptOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub naming: NamingPolicy,
    pub member_serialization: MemberSerialization,
    /// Write `int64` values as JSON strings.
    pub int64_as_string: bool,
    /// Write enums as their ordinal instead of the variant name.
    pub enums_as_integer: bool,
    /// `chrono` format string for `datetime` values; RFC 3339 when unset.
    pub date_time_format: Option<String>,
    /// Indent used by the pretty text helpers.
    pub pretty_indent: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            naming: NamingPolicy::Identity,
            member_serialization: MemberSerialization::Default,
            int64_as_string: false,
            enums_as_integer: false,
            date_time_format: None,
            pretty_indent: crate::json::PRETTY_INDENT,
        }
    }
}

impl CodecConfig {
    /// # Errors
    /// Returns a `ConfigError` if the text is not a valid configuration.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// # Errors
    /// Returns a `ConfigError` if the text is not a valid configuration.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    #[must_use]
    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    #[must_use]
    pub fn with_member_serialization(mut self, policy: MemberSerialization) -> Self {
        self.member_serialization = policy;
        self
    }
}
