//! Serialization of an element subtree back to XML text.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::element::Element;
use crate::error::StreamError;

/// Serialize an element and its attached subtree.
///
/// The element's own tail is not included; tails of its children are.
///
/// # Examples
/// ```
/// use yax::{xml::to_xml_string, Element};
///
/// let root = Element::parse(r#"<a x="1">t<b/>tail</a>"#).unwrap();
/// assert_eq!(to_xml_string(&root).unwrap(), r#"<a x="1">t<b/>tail</a>"#);
/// ```
pub fn to_xml_string(element: &Element) -> Result<String, StreamError> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, element)?;
    String::from_utf8(writer.into_inner()).map_err(|err| StreamError::Serialize {
        tag: element.tag().to_string(),
        message: err.to_string(),
    })
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), StreamError> {
    let mut start = BytesStart::new(element.tag());
    for (key, value) in element.attrib().iter() {
        start.push_attribute((key, value));
    }

    if element.text().is_none() && element.children().is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = element.text() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in element.children() {
        write_element(writer, child)?;
        if let Some(tail) = child.tail() {
            writer.write_event(Event::Text(BytesText::new(tail)))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.tag())))?;
    Ok(())
}
