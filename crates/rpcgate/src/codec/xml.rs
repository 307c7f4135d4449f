use bytes::Bytes;
use http::StatusCode;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::Value;

use super::{ArgsPayload, Codec, EncodedResponse};
use crate::context::content_type;
use crate::envelope::ResponseEnvelope;
use crate::error::EncodeError;

/// XML wire format
///
/// Success: `<response><result>...</result></response>`.
/// Failure: `<error><error_code/><error_msg/><error_data/></error>`, with
/// `error_data` left out when the error has no data. Objects become child
/// elements and arrays become repeated `<item>` elements. Text or names with
/// characters XML 1.0 does not allow are an encode error.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn content_type(&self) -> &'static str {
        content_type::XML
    }

    fn accepts(&self, media_type: &str) -> bool {
        media_type.eq_ignore_ascii_case("application/xml") || media_type.eq_ignore_ascii_case("text/xml")
    }

    fn body_payload(&self, body: Bytes) -> ArgsPayload {
        ArgsPayload::Xml(body)
    }

    fn encode(
        &self,
        envelope: &ResponseEnvelope,
        status: StatusCode,
    ) -> Result<EncodedResponse, EncodeError> {
        let mut writer = Writer::new(Vec::with_capacity(128));
        write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.get_mut().push(b'\n');

        if let Some(err) = envelope.error() {
            start(&mut writer, "error")?;
            text_element(&mut writer, "error_code", &err.code().to_string())?;
            text_element(&mut writer, "error_msg", err.message())?;
            if let Some(data) = err.data() {
                start(&mut writer, "error_data")?;
                write_value(&mut writer, data)?;
                end(&mut writer, "error_data")?;
            }
            end(&mut writer, "error")?;
        } else {
            start(&mut writer, "response")?;
            start(&mut writer, "result")?;
            if let Some(response) = envelope.response() {
                write_value(&mut writer, response)?;
            }
            end(&mut writer, "result")?;
            end(&mut writer, "response")?;
        }

        Ok(EncodedResponse {
            status,
            content_type: content_type::XML,
            body: Bytes::from(writer.into_inner()),
        })
    }
}

type XmlWriter = Writer<Vec<u8>>;

fn write_event(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), EncodeError> {
    writer
        .write_event(event)
        .map_err(|err| EncodeError::Xml(err.to_string()))
}

fn start(writer: &mut XmlWriter, name: &str) -> Result<(), EncodeError> {
    write_event(writer, Event::Start(BytesStart::new(name)))
}

fn end(writer: &mut XmlWriter, name: &str) -> Result<(), EncodeError> {
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn text(writer: &mut XmlWriter, content: &str) -> Result<(), EncodeError> {
    check_chars(content)?;
    write_event(writer, Event::Text(BytesText::new(content)))
}

fn text_element(writer: &mut XmlWriter, name: &str, content: &str) -> Result<(), EncodeError> {
    start(writer, name)?;
    text(writer, content)?;
    end(writer, name)
}

fn write_value(writer: &mut XmlWriter, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Null => Ok(()),
        Value::Bool(b) => text(writer, if *b { "true" } else { "false" }),
        Value::Number(n) => text(writer, &n.to_string()),
        Value::String(s) => text(writer, s),
        Value::Array(items) => {
            for item in items {
                start(writer, "item")?;
                write_value(writer, item)?;
                end(writer, "item")?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (key, item) in map {
                if !is_valid_element_name(key) {
                    return Err(EncodeError::InvalidElementName(key.clone()));
                }
                start(writer, key)?;
                write_value(writer, item)?;
                end(writer, key)?;
            }
            Ok(())
        }
    }
}

/// XML 1.0 `Char` production
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}

fn check_chars(content: &str) -> Result<(), EncodeError> {
    match content.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(EncodeError::InvalidXmlChar(c)),
        None => Ok(()),
    }
}

// Conservative subset of the XML Name production
fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| is_xml_char(c) && (c.is_alphanumeric() || matches!(c, '_' | '-' | '.')))
}
