//! Minimal XML property-list reader for RAID headers and boot configuration.


use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, thiserror::Error)]
pub enum PlistError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("no property list value found")]
    Empty,
    #[error("property list ended inside <{0}>")]
    UnexpectedEof(String),
    #[error("unexpected <{0}>")]
    Unexpected(String),
}

/// A parsed property-list value.
///
/// Integers keep their source text; [`crate::metadata::whole_number`] decides
/// how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Dict(Dict),
    Array(Vec<Value>),
    String(String),
    Integer(String),
    Real(String),
    Data(String),
    Date(String),
    Boolean(bool),
}

/// Ordered key/value dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict(Vec<(String, Value)>);

impl Dict {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Value {
    #[must_use]
    pub const fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer_text(&self) -> Option<&str> {
        match self {
            Self::Integer(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the value's element, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Dict(_) => "dict",
            Self::Array(_) => "array",
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Data(_) => "data",
            Self::Date(_) => "date",
            Self::Boolean(_) => "boolean",
        }
    }
}

/// `parse` reads the first value of an XML property list.
///
/// The `<plist>` wrapper, XML declaration and DOCTYPE are optional; anything
/// after the first NUL byte is ignored.
///
/// # Errors
/// Returns a [`PlistError`] if the XML is malformed or holds no value.
pub fn parse(bytes: &[u8]) -> Result<Value, PlistError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let mut reader = Reader::from_reader(&bytes[..end]);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"plist" => {}
            Event::Start(e) => return parse_element(&mut reader, &e),
            Event::Empty(e) if e.name().as_ref() == b"plist" => return Err(PlistError::Empty),
            Event::Empty(e) => return empty_element(&e),
            Event::End(_) | Event::Eof => return Err(PlistError::Empty),
            _ => {}
        }
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn empty_element(e: &BytesStart<'_>) -> Result<Value, PlistError> {
    Ok(match e.name().as_ref() {
        b"true" => Value::Boolean(true),
        b"false" => Value::Boolean(false),
        b"dict" => Value::Dict(Dict::default()),
        b"array" => Value::Array(Vec::new()),
        b"string" => Value::String(String::new()),
        b"data" => Value::Data(String::new()),
        _ => return Err(PlistError::Unexpected(tag_name(e))),
    })
}

fn parse_element(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Value, PlistError> {
    let name = start.name();
    let tag = name.as_ref();
    match tag {
        b"dict" => parse_dict(reader).map(Value::Dict),
        b"array" => parse_array(reader).map(Value::Array),
        b"string" => read_text(reader, tag).map(Value::String),
        b"integer" => read_text(reader, tag).map(Value::Integer),
        b"real" => read_text(reader, tag).map(Value::Real),
        b"data" => read_text(reader, tag).map(Value::Data),
        b"date" => read_text(reader, tag).map(Value::Date),
        b"true" => read_text(reader, tag).map(|_| Value::Boolean(true)),
        b"false" => read_text(reader, tag).map(|_| Value::Boolean(false)),
        _ => Err(PlistError::Unexpected(tag_name(start))),
    }
}

fn parse_dict(reader: &mut Reader<&[u8]>) -> Result<Dict, PlistError> {
    let mut dict = Dict::default();
    let mut key: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"key" => {
                key = Some(read_text(reader, b"key")?);
            }
            Event::Start(e) => {
                let value = parse_element(reader, &e)?;
                match key.take() {
                    Some(k) => dict.insert(k, value),
                    None => return Err(PlistError::Unexpected(tag_name(&e))),
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"key" => key = Some(String::new()),
            Event::Empty(e) => {
                let value = empty_element(&e)?;
                match key.take() {
                    Some(k) => dict.insert(k, value),
                    None => return Err(PlistError::Unexpected(tag_name(&e))),
                }
            }
            Event::End(_) => return Ok(dict),
            Event::Eof => return Err(PlistError::UnexpectedEof("dict".to_string())),
            _ => {}
        }
    }
}

fn parse_array(reader: &mut Reader<&[u8]>) -> Result<Vec<Value>, PlistError> {
    let mut items = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => items.push(parse_element(reader, &e)?),
            Event::Empty(e) => items.push(empty_element(&e)?),
            Event::End(_) => return Ok(items),
            Event::Eof => return Err(PlistError::UnexpectedEof("array".to_string())),
            _ => {}
        }
    }
}

fn read_text(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<String, PlistError> {
    let mut out = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => out.push_str(&t.unescape()?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if e.name().as_ref() == tag => return Ok(out),
            Event::Start(e) | Event::Empty(e) => return Err(PlistError::Unexpected(tag_name(&e))),
            Event::Eof => {
                return Err(PlistError::UnexpectedEof(
                    String::from_utf8_lossy(tag).into_owned(),
                ));
            }
            _ => {}
        }
    }
}
