//! Adapter from tokenizer events to open/text/close tokens.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::element::{Attributes, Element};
use crate::error::StreamError;

/// One step of the token stream, already owned.
#[derive(Debug)]
pub(crate) enum Token {
    /// `<tag ...>`
    Open(Element),
    /// `<tag .../>`, an open immediately followed by a close.
    Empty(Element),
    /// `</tag>`
    Close,
    /// Character data (unescaped) or CDATA content (raw).
    Text(String),
    Eof,
    /// Comments, processing instructions, declarations.
    Other,
}

/// Read the next token from the tokenizer.
///
/// `buf` is reused between calls and cleared here.
pub(crate) fn read_token<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<Token, StreamError> {
    buf.clear();
    let token = match reader.read_event_into(buf)? {
        Event::Start(start) => Token::Open(start_element(&start)?),
        Event::Empty(start) => Token::Empty(start_element(&start)?),
        Event::End(_) => Token::Close,
        Event::Text(text) => Token::Text(text.unescape()?.into_owned()),
        Event::CData(cdata) => Token::Text(String::from_utf8_lossy(&cdata).into_owned()),
        Event::Eof => Token::Eof,
        _ => Token::Other,
    };
    Ok(token)
}

/// Build a childless element from a start tag.
fn start_element(start: &BytesStart<'_>) -> Result<Element, StreamError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attrib = Attributes::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrib.insert(key, value);
    }

    Ok(Element::new(tag).with_attributes(attrib))
}
