//! Built-in converters, in the order [`crate::converter::ConverterRegistry`]
//! tries them.

mod array;
mod collection;
mod date;
mod dictionary;
mod enumeration;
mod primitive;
mod reflected;
mod type_ref;

pub use array::ArrayConverter;
pub use collection::CollectionConverter;
pub use date::DateTimeConverter;
pub use dictionary::DictionaryConverter;
pub use enumeration::EnumConverter;
pub use primitive::PrimitiveConverter;
pub use reflected::ReflectedConverter;
pub use type_ref::TypeRefConverter;
