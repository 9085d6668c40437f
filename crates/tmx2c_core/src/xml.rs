//! Attribute and child lookups over the parsed document tree
//!
//! These helpers are stateless. Missing required values and malformed
//! numbers are reported as [`ModelError`] naming the element and attribute.

use roxmltree::Node;

use crate::ModelError;

/// Whether the node is an element (as opposed to text, comments, ...)
pub fn is_element(node: Node<'_, '_>) -> bool {
    node.is_element()
}

fn element_name(node: Node<'_, '_>) -> String {
    node.tag_name().name().to_string()
}

/// Read an optional string attribute
pub fn optional_str<'a>(node: Node<'a, '_>, attribute: &str) -> Option<&'a str> {
    node.attribute(attribute)
}

/// Read a required string attribute
pub fn required_str<'a>(node: Node<'a, '_>, attribute: &str) -> Result<&'a str, ModelError> {
    node.attribute(attribute)
        .ok_or_else(|| ModelError::MissingAttribute {
            element: element_name(node),
            attribute: attribute.to_string(),
        })
}

/// Parse an integer the way the editor writes them.
///
/// Plain integers are taken as-is; decimal values (object coordinates are
/// often fractional) are truncated toward zero.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }

    let value = text.parse::<f64>().ok().filter(|v| v.is_finite())?.trunc();
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

/// Read an optional integer attribute.
///
/// An absent attribute is `Ok(None)`; a present but malformed or
/// out-of-range value is an error.
pub fn optional_int<T>(node: Node<'_, '_>, attribute: &str) -> Result<Option<T>, ModelError>
where
    T: TryFrom<i64>,
{
    let Some(text) = node.attribute(attribute) else {
        return Ok(None);
    };

    parse_int(text)
        .and_then(|value| T::try_from(value).ok())
        .map(Some)
        .ok_or_else(|| ModelError::InvalidAttribute {
            element: element_name(node),
            attribute: attribute.to_string(),
            value: text.to_string(),
        })
}

/// Read a required integer attribute
pub fn required_int<T>(node: Node<'_, '_>, attribute: &str) -> Result<T, ModelError>
where
    T: TryFrom<i64>,
{
    optional_int(node, attribute)?.ok_or_else(|| ModelError::MissingAttribute {
        element: element_name(node),
        attribute: attribute.to_string(),
    })
}

/// Read a required integer attribute that must be strictly positive
pub fn required_positive(node: Node<'_, '_>, attribute: &str) -> Result<u32, ModelError> {
    let value: u32 = required_int(node, attribute)?;
    if value == 0 {
        return Err(ModelError::InvalidAttribute {
            element: element_name(node),
            attribute: attribute.to_string(),
            value: "0".to_string(),
        });
    }
    Ok(value)
}

/// Find the first child element with the given name
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| is_element(*n) && n.tag_name().name() == name)
}

/// Find the first child element with the given name, failing if absent
pub fn required_child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, ModelError> {
    child(node, name).ok_or_else(|| ModelError::MissingElement {
        element: element_name(node),
        child: name.to_string(),
    })
}

/// Iterate all child elements with the given name, in document order
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| is_element(*n) && n.tag_name().name() == name)
}

/// The contents of the first text child, if any
pub fn first_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.children().find(|n| n.is_text()).and_then(|n| n.text())
}
