//! Object groups: rectangle objects and polygons

use roxmltree::Node;
use serde::Serialize;

use crate::property::{is_single_precision, read_optional_properties, Properties};
use crate::xml::{child, children, optional_int, optional_str, required_int, required_str};
use crate::ModelError;

/// A collection of freely positioned objects
///
/// Appears at map top level or nested inside a tileset tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectGroup {
    pub id: u32,
    pub name: Option<String>,
    pub objects: Vec<Object>,
    pub polygons: Vec<Polygon>,
}

/// A rectangle object, optionally referencing a tile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Object {
    pub id: u32,
    /// Global tile id, when the object is a tile object
    pub gid: Option<u32>,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Free-form kind tag
    pub object_type: Option<String>,
    pub properties: Properties,
}

/// A single polygon vertex, kept as the decimal text from the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: String,
    pub y: String,
}

/// A closed polygon relative to its position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub object_type: Option<String>,
    /// Always holds at least one point
    pub points: Vec<Point>,
    pub properties: Properties,
}

impl ObjectGroup {
    /// Build an object group from an `<objectgroup>` element
    pub fn read(element: Node<'_, '_>) -> Result<Self, ModelError> {
        let id = required_int(element, "id")?;
        let name = optional_str(element, "name").map(str::to_string);
        let mut objects = Vec::new();
        let mut polygons = Vec::new();

        for object in children(element, "object") {
            let object_id = required_int(object, "id")?;
            let x = required_int(object, "x")?;
            let y = required_int(object, "y")?;
            let object_type = object_type(object);
            let properties = read_optional_properties(object)?;

            if let Some(polygon) = child(object, "polygon") {
                let points = parse_points(required_str(polygon, "points")?)?;
                polygons.push(Polygon {
                    id: object_id,
                    x,
                    y,
                    object_type,
                    points,
                    properties,
                });
                continue;
            }

            objects.push(Object {
                id: object_id,
                gid: optional_int(object, "gid")?,
                x,
                y,
                width: required_int(object, "width")?,
                height: required_int(object, "height")?,
                object_type,
                properties,
            });
        }

        Ok(Self {
            id,
            name,
            objects,
            polygons,
        })
    }

    /// Every kind tag used by an object or polygon in this group
    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.objects
            .iter()
            .filter_map(|o| o.object_type.as_deref())
            .chain(self.polygons.iter().filter_map(|p| p.object_type.as_deref()))
    }
}

// Newer editor versions write `class` instead of `type`
fn object_type(object: Node<'_, '_>) -> Option<String> {
    optional_str(object, "type")
        .or_else(|| optional_str(object, "class"))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Parse a `points` attribute (`"x1,y1 x2,y2 ..."`)
pub fn parse_points(text: &str) -> Result<Vec<Point>, ModelError> {
    let mut points = Vec::new();

    for token in text.split_whitespace() {
        let mut parts = token.split(',');
        let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ModelError::InvalidPoint(token.to_string()));
        };
        if !is_single_precision(x) || !is_single_precision(y) {
            return Err(ModelError::InvalidPoint(token.to_string()));
        }
        points.push(Point {
            x: x.to_string(),
            y: y.to_string(),
        });
    }

    if points.is_empty() {
        return Err(ModelError::InvalidPoint(text.to_string()));
    }
    Ok(points)
}
