//! Binding of one registered condition to a converter and a user callback.

use std::fmt;

use super::convert::{Converter, Output, OutputFormat};
use crate::error::{CallbackError, StreamError};
use crate::reader::Position;
use crate::xml::Element;

/// User callback: receives the converted element and its position.
pub type Callback<'a> = Box<dyn FnMut(Output<'_>, Position) -> Result<(), CallbackError> + 'a>;

/// Runner returned by registration.
///
/// Without a callback a match is counted but nothing is converted.
pub struct CallbackRunner<'a> {
    converter: Converter,
    callback: Option<Callback<'a>>,
}

impl<'a> CallbackRunner<'a> {
    #[must_use]
    pub(crate) fn new(converter: Converter) -> Self {
        Self {
            converter,
            callback: None,
        }
    }

    /// Choose the representation passed to the callback.
    pub fn output(&mut self, format: OutputFormat) -> &mut Self {
        self.converter.set_format(format);
        self
    }

    /// Bind the callback, replacing any earlier one.
    ///
    /// # Examples
    /// ```
    /// use yax::{OutputFormat, StreamReader};
    ///
    /// let mut names = Vec::new();
    /// let mut reader = StreamReader::from_reader("<a><b>x</b><b>y</b></a>".as_bytes());
    /// reader
    ///     .find(yax::ConditionFields::new().with_tag("b"))
    ///     .unwrap()
    ///     .output(OutputFormat::String)
    ///     .calls(|output, _position| {
    ///         names.push(output.as_str().unwrap_or_default().to_string());
    ///         Ok(())
    ///     });
    /// reader.start().unwrap();
    /// drop(reader);
    /// assert_eq!(names, ["<b>x</b>", "<b>y</b>"]);
    /// ```
    pub fn calls<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(Output<'_>, Position) -> Result<(), CallbackError> + 'a,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.converter.format()
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Convert `element` and hand it to the callback.
    pub(crate) fn run(&mut self, element: &Element, position: Position) -> Result<(), StreamError> {
        let Some(callback) = self.callback.as_mut() else {
            return Ok(());
        };
        let output = self.converter.convert(element)?;
        callback(output, position).map_err(|source| StreamError::Callback { position, source })
    }
}

impl fmt::Debug for CallbackRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRunner")
            .field("converter", &self.converter)
            .field("has_callback", &self.has_callback())
            .finish()
    }
}
