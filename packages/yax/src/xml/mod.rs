//! XML layer: element tree, tokenizer adapter, builder and serializer.

mod builder;
mod element;
mod tokens;
mod writer;

pub use builder::TreeBuilder;
pub use element::{Attributes, Element};
pub use writer::to_xml_string;

pub(crate) use tokens::{read_token, Token};
