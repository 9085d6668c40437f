//! Typed property payloads
//!
//! Numeric payloads keep the text exactly as written in the document so the
//! emitted literal matches the source without reformatting drift.

use indexmap::IndexMap;
use regex::Regex;
use roxmltree::Node;
use serde::Serialize;
use std::sync::LazyLock;

use crate::xml::{children, required_str};
use crate::ModelError;

static COLOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{8}$").expect("valid color pattern"));

/// Named properties in document order
///
/// A repeated name replaces the earlier value in place.
pub type Properties = IndexMap<String, PropertyValue>;

/// An RGBA color with one byte per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Parse the editor's `#AARRGGBB` notation
    pub fn parse(text: &str) -> Option<Self> {
        if !COLOR_PATTERN.is_match(text) {
            return None;
        }
        let channel = |offset: usize| u8::from_str_radix(&text[offset..offset + 2], 16).ok();

        Some(Self {
            a: channel(1)?,
            r: channel(3)?,
            g: channel(5)?,
            b: channel(7)?,
        })
    }
}

/// The payload of a single property
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    /// Integer, kept as written
    Int(String),
    /// Decimal, kept as written
    Float(String),
    String(String),
    Bool(bool),
    /// Path to a file, relative to the map
    File(String),
    Color(Color),
    /// Id of another object on the map
    Object(u32),
}

impl PropertyValue {
    /// Build a payload from the `type` and `value` attributes of a `<property>`
    ///
    /// Unknown or absent types fall back to [`PropertyValue::String`].
    pub fn parse(name: &str, kind: Option<&str>, value: &str) -> Result<Self, ModelError> {
        let invalid = |kind: &'static str| ModelError::InvalidProperty {
            name: name.to_string(),
            kind,
            value: value.to_string(),
        };

        let parsed = match kind {
            Some("int") => {
                value.trim().parse::<i64>().map_err(|_| invalid("int"))?;
                PropertyValue::Int(value.trim().to_string())
            }
            Some("float") => {
                if !is_single_precision(value.trim()) {
                    return Err(invalid("float"));
                }
                PropertyValue::Float(value.trim().to_string())
            }
            Some("bool") => match value {
                "true" => PropertyValue::Bool(true),
                "false" => PropertyValue::Bool(false),
                _ => return Err(invalid("bool")),
            },
            Some("color") => {
                PropertyValue::Color(Color::parse(value).ok_or_else(|| invalid("color"))?)
            }
            Some("file") => PropertyValue::File(value.to_string()),
            Some("object") => {
                let id = value.trim().parse::<u32>().map_err(|_| invalid("object"))?;
                PropertyValue::Object(id)
            }
            _ => PropertyValue::String(value.to_string()),
        };

        Ok(parsed)
    }

    /// Short name of the payload kind
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::File(_) => "file",
            PropertyValue::Color(_) => "color",
            PropertyValue::Object(_) => "object",
        }
    }
}

/// Whether decimal text survives as a single-precision literal
///
/// The value must be finite as an `f32`, and a non-zero value may not
/// underflow to zero.
pub(crate) fn is_single_precision(text: &str) -> bool {
    let (Ok(wide), Ok(narrow)) = (text.parse::<f64>(), text.parse::<f32>()) else {
        return false;
    };
    wide.is_finite() && narrow.is_finite() && (wide == 0.0 || narrow != 0.0)
}

/// Read every `<property>` below a `<properties>` element
pub fn read_properties(element: Node<'_, '_>) -> Result<Properties, ModelError> {
    let mut properties = Properties::new();

    for property in children(element, "property") {
        let name = required_str(property, "name")?;
        let value = required_str(property, "value")?;
        let parsed = PropertyValue::parse(name, property.attribute("type"), value)?;
        properties.insert(name.to_string(), parsed);
    }

    Ok(properties)
}

/// Read the optional `<properties>` child of an element
pub fn read_optional_properties(element: Node<'_, '_>) -> Result<Properties, ModelError> {
    match crate::xml::child(element, "properties") {
        Some(properties) => read_properties(properties),
        None => Ok(Properties::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_color_parse() {
        let color = Color::parse("#80ff0010").unwrap();
        assert_eq!(
            color,
            Color {
                a: 0x80,
                r: 0xff,
                g: 0x00,
                b: 0x10
            }
        );
        assert_eq!(Color::parse("#FFAABBCC").unwrap().a, 0xff);
        assert!(Color::parse("#ffffff").is_none());
        assert!(Color::parse("ff00ff00").is_none());
        assert!(Color::parse("#gg00ff00").is_none());
        assert!(Color::parse("").is_none());
    }

    #[test]
    fn test_parse_each_kind() {
        assert_eq!(
            PropertyValue::parse("hp", Some("int"), "-12").unwrap(),
            PropertyValue::Int("-12".to_string())
        );
        assert_eq!(
            PropertyValue::parse("speed", Some("float"), "1.25e3").unwrap(),
            PropertyValue::Float("1.25e3".to_string())
        );
        assert_eq!(
            PropertyValue::parse("open", Some("bool"), "true").unwrap(),
            PropertyValue::Bool(true)
        );
        assert_eq!(
            PropertyValue::parse("script", Some("file"), "a.lua").unwrap(),
            PropertyValue::File("a.lua".to_string())
        );
        assert_eq!(
            PropertyValue::parse("target", Some("object"), "17").unwrap(),
            PropertyValue::Object(17)
        );
        assert_eq!(
            PropertyValue::parse("label", None, "hello").unwrap(),
            PropertyValue::String("hello".to_string())
        );
        assert_eq!(
            PropertyValue::parse("label", Some("class"), "x").unwrap(),
            PropertyValue::String("x".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_literals() {
        for (kind, value) in [
            ("int", "1.5"),
            ("int", "ten"),
            ("float", "fast"),
            ("float", "inf"),
            ("float", "1e100"),
            ("float", "-3.5e39"),
            ("float", "1e-60"),
            ("bool", "True"),
            ("bool", "1"),
            ("color", "#fff"),
            ("object", "-1"),
        ] {
            let result = PropertyValue::parse("p", Some(kind), value);
            match result {
                Err(ModelError::InvalidProperty { kind: k, .. }) => assert_eq!(k, kind),
                other => panic!("Expected failure for {kind}={value}, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_single_precision_range() {
        assert!(is_single_precision("0"));
        assert!(is_single_precision("-0.0"));
        assert!(is_single_precision("3.4e38"));
        assert!(is_single_precision("1e-30"));
        assert!(!is_single_precision("3.5e39"));
        assert!(!is_single_precision("1e-60"));
        assert!(!is_single_precision("NaN"));
        assert!(!is_single_precision(""));
    }

    #[test]
    fn test_read_properties_keeps_order_and_replaces_duplicates() {
        let doc = Document::parse(
            r##"<properties>
                <property name="b" value="1" type="int"/>
                <property name="a" value="x"/>
                <property name="b" value="2" type="int"/>
                <property name="tint" type="color" value="#ff102030"/>
            </properties>"##,
        )
        .unwrap();

        let properties = read_properties(doc.root_element()).unwrap();
        let names: Vec<_> = properties.keys().cloned().collect();
        assert_eq!(names, vec!["b", "a", "tint"]);
        assert_eq!(properties["b"], PropertyValue::Int("2".to_string()));
        assert_eq!(properties["tint"].kind(), "color");
    }

    #[test]
    fn test_read_properties_requires_name_and_value() {
        let doc = Document::parse(r#"<properties><property name="a"/></properties>"#).unwrap();
        assert!(matches!(
            read_properties(doc.root_element()),
            Err(ModelError::MissingAttribute { .. })
        ));
    }
}
