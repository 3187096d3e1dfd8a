//! Callback runners and the output converters they apply.

mod callback;
mod convert;

pub use callback::{Callback, CallbackRunner};
pub use convert::{to_prefixed, Converter, NestedElement, Output, OutputFormat};
