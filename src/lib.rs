pub mod aot;
pub mod api;
pub mod codec;
pub mod config;
pub mod converter;
pub mod converters;
pub mod cycles;
pub mod error;
pub mod json;
pub mod lexer;
pub mod metadata;
pub mod parser;
pub mod registry;
mod serialization;
pub mod type_cache;
pub mod types;
pub mod utils;
pub mod value;

pub use api::{from_json_str, to_json_string};
pub use codec::Codec;
pub use config::CodecConfig;
pub use error::{CodecError, FsonError, Outcome};
pub use json::JsonValue;
pub use registry::TypeRegistry;
pub use value::{ObjectRef, Value};
