//! Projection of the XML listing feed onto JSON values.
//!
//! Elements become objects keyed by child tag, a repeated tag becomes an array,
//! attributes merge into the element object as strings, and an element with only
//! text collapses to that string. Text mixed with attributes or children lands
//! under `"_"`. Whitespace-only text is dropped.

use roxmltree::{Document, Node, ParsingOptions};
use serde_json::{Map, Value};

const TEXT_KEY: &str = "_";

/// Vendor pages may open with a `<!DOCTYPE>`; the declaration is accepted and
/// otherwise ignored.
pub fn document_to_value(xml: &str) -> Result<Value, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options)?;
    let root = document.root_element();
    let mut wrapper = Map::new();
    wrapper.insert(root.tag_name().name().to_string(), element_to_value(root));
    Ok(Value::Object(wrapper))
}

/// Records under `data/properties/property`. A lone property is a one-element list.
pub fn property_records(xml: &str) -> Result<Vec<Value>, roxmltree::Error> {
    let mut document = document_to_value(xml)?;
    let records = match document.pointer_mut("/data/properties/property") {
        Some(node) => node.take(),
        None => return Ok(Vec::new()),
    };

    Ok(match records {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::String(text) if text.is_empty() => Vec::new(),
        single => vec![single],
    })
}

fn element_to_value(node: Node<'_, '_>) -> Value {
    let mut fields = Map::new();
    for attribute in node.attributes() {
        merge_field(
            &mut fields,
            attribute.name(),
            Value::String(attribute.value().to_string()),
        );
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            merge_field(&mut fields, child.tag_name().name(), element_to_value(child));
        } else if child.is_text() {
            if let Some(chunk) = child.text() {
                text.push_str(chunk);
            }
        }
    }

    let has_text = !text.trim().is_empty();
    if fields.is_empty() {
        return Value::String(if has_text { text } else { String::new() });
    }
    if has_text {
        fields.insert(TEXT_KEY.to_string(), Value::String(text));
    }
    Value::Object(fields)
}

fn merge_field(fields: &mut Map<String, Value>, key: &str, value: Value) {
    match fields.get_mut(key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key.to_string(), value);
        }
    }
}
