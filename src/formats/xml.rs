//! Markup codec.
//!
//! Layout is a root element holding one element per record. Within a record a
//! repeated sibling element becomes an array and a singleton stays a bare
//! value; elements with children become objects and leaves become strings.
//! Attributes are not part of the record model and are ignored on read.

use super::{value_to_text, Format, FormatAdapter};
use crate::error::{ConvertError, Result};
use crate::types::{Dataset, Loaded, Record, RelationSelector};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use std::path::Path;

const ROOT_TAG: &str = "root";
const RECORD_TAG: &str = "record";
const NESTED_ITEM_TAG: &str = "item";

pub struct XmlAdapter;

/// Parsed element tree, before mapping onto values
#[derive(Debug)]
struct Element {
    name: String,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn new(name: String) -> Self {
        Element {
            name,
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// Text of an element with children is only the indentation between
    /// them and is discarded; a leaf keeps its text verbatim.
    fn into_value(self) -> Value {
        if self.children.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(children_to_record(self.children))
        }
    }
}

fn children_to_record(children: Vec<Element>) -> Record {
    let mut record = Map::new();
    for child in children {
        let name = child.name.clone();
        let value = child.into_value();
        // Element values are never arrays, so an array here means a repeat.
        match record.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                record.insert(name, value);
            }
        }
    }
    record
}

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, el: Element) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(el);
            Ok(())
        }
        None if root.is_some() => Err(format!("unexpected second root element <{}>", el.name)),
        None => {
            *root = Some(el);
            Ok(())
        }
    }
}

fn parse_tree(content: &str) -> std::result::Result<Element, String> {
    // No trimming: leading, trailing and whitespace-only values are data.
    let mut reader = Reader::from_str(content);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(Element::new(tag_name(&start))),
            Event::Empty(start) => attach(&mut stack, &mut root, Element::new(tag_name(&start)))?,
            Event::End(_) => {
                let el = stack.pop().ok_or_else(|| "unexpected closing tag".to_string())?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

/// Turn a field name into something usable as an element name
fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    let starts_ok = name
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_ok {
        name.insert(0, '_');
    }
    name
}

type XmlWriter = Writer<Vec<u8>>;

fn write_field(writer: &mut XmlWriter, name: &str, value: &Value) -> std::result::Result<(), String> {
    match value {
        Value::Object(obj) => {
            if obj.is_empty() {
                return Ok(());
            }
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(|e| e.to_string())?;
            for (key, sub) in obj {
                write_field(writer, &element_name(key), sub)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| e.to_string())?;
        }
        Value::Array(items) => {
            for item in items {
                if let Value::Array(inner) = item {
                    writer
                        .write_event(Event::Start(BytesStart::new(name)))
                        .map_err(|e| e.to_string())?;
                    for nested in inner {
                        write_field(writer, NESTED_ITEM_TAG, nested)?;
                    }
                    writer
                        .write_event(Event::End(BytesEnd::new(name)))
                        .map_err(|e| e.to_string())?;
                } else {
                    write_field(writer, name, item)?;
                }
            }
        }
        scalar => match value_to_text(scalar) {
            None => writer
                .write_event(Event::Empty(BytesStart::new(name)))
                .map_err(|e| e.to_string())?,
            Some(text) => {
                writer
                    .write_event(Event::Start(BytesStart::new(name)))
                    .map_err(|e| e.to_string())?;
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(|e| e.to_string())?;
                writer
                    .write_event(Event::End(BytesEnd::new(name)))
                    .map_err(|e| e.to_string())?;
            }
        },
    }
    Ok(())
}

impl XmlAdapter {
    /// Parse a markup document into a dataset
    pub fn parse(content: &str) -> std::result::Result<Dataset, String> {
        let root = parse_tree(content)?;
        Ok(root
            .children
            .into_iter()
            .map(|record| children_to_record(record.children))
            .collect())
    }

    /// Render a dataset as `<root><record>...</record>...</root>`
    pub fn render(dataset: &Dataset) -> std::result::Result<Vec<u8>, String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| e.to_string())?;

        if dataset.is_empty() {
            writer
                .write_event(Event::Empty(BytesStart::new(ROOT_TAG)))
                .map_err(|e| e.to_string())?;
            return Ok(writer.into_inner());
        }

        writer
            .write_event(Event::Start(BytesStart::new(ROOT_TAG)))
            .map_err(|e| e.to_string())?;
        for record in dataset.records() {
            writer
                .write_event(Event::Start(BytesStart::new(RECORD_TAG)))
                .map_err(|e| e.to_string())?;
            for (key, value) in record {
                write_field(&mut writer, &element_name(key), value)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(RECORD_TAG)))
                .map_err(|e| e.to_string())?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(ROOT_TAG)))
            .map_err(|e| e.to_string())?;

        Ok(writer.into_inner())
    }
}

impl FormatAdapter for XmlAdapter {
    fn read(&self, source: &Path, _selector: Option<&RelationSelector>) -> Result<Loaded> {
        let content = std::fs::read_to_string(source)
            .map_err(|e| ConvertError::from_read_io(source, Format::Xml, e))?;
        let dataset = Self::parse(&content).map_err(|e| ConvertError::malformed(source, Format::Xml, e))?;

        tracing::debug!(path = %source.display(), rows = dataset.len(), "read xml");
        Ok(Loaded::Single(dataset))
    }

    fn write(&self, dataset: &Dataset, destination: &Path) -> Result<()> {
        let bytes = Self::render(dataset).map_err(|e| ConvertError::unwritable(destination, e))?;
        std::fs::write(destination, bytes).map_err(|e| ConvertError::unwritable(destination, e))
    }
}
