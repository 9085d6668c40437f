//! Core data structures for tmx2c
//!
//! This crate turns a Tiled TMX document into a typed, validated model:
//! - `Map` - A complete map with tilesets, layers and object groups
//! - `Tileset` - Tile atlas configuration with per-tile metadata
//! - `Layer` - A decoded grid of global tile ids
//! - `ObjectGroup` - Rectangle objects and polygons
//! - `PropertyValue` - Typed property payloads
//!
//! Every reader validates while it builds; a violation anywhere in a map's
//! subtree fails the whole map and no partial model is returned.
//!
//! # Example
//!
//! ```rust,ignore
//! use tmx2c_core::load_map;
//!
//! let map = load_map("levels/first.tmx")?;
//! println!("{}x{} tiles, {} layers", map.width, map.height, map.layers.len());
//! ```

mod layer;
mod map;
mod object_group;
mod property;
mod tileset;
pub mod xml;

pub use layer::{decode_tile_data, Layer};
pub use map::{LayerKind, LayerOrder, Map};
pub use object_group::{Object, ObjectGroup, Point, Polygon};
pub use property::{Color, Properties, PropertyValue};
pub use tileset::{Tile, Tileset, TilesetImage};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while building a map model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Expected <{expected}> root element, found <{found}>")]
    UnexpectedRoot { expected: String, found: String },

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("<{element}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("<{element}> is missing required child <{child}>")]
    MissingElement { element: String, child: String },

    #[error("Tileset image {} is not readable: {source}", path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported layer data encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Layer '{layer}' has invalid tile data: {reason}")]
    InvalidTileData { layer: String, reason: String },

    #[error("Invalid polygon point '{0}'")]
    InvalidPoint(String),

    #[error("Property '{name}' has invalid {kind} value '{value}'")]
    InvalidProperty {
        name: String,
        kind: &'static str,
        value: String,
    },

    #[error("Tilesets '{first}' and '{second}' share firstgid {firstgid}")]
    DuplicateFirstGid {
        first: String,
        second: String,
        firstgid: u32,
    },

    #[error("Tileset '{tileset}' describes tile {id} more than once")]
    DuplicateTileId { tileset: String, id: u32 },

    #[error("Tileset '{name}' declares {tile_count} tiles but describes {described}")]
    TooManyTiles {
        name: String,
        tile_count: u32,
        described: usize,
    },
}

/// Load and build a map from a TMX file
///
/// Tileset images are resolved relative to the directory holding `path`.
pub fn load_map(path: impl AsRef<Path>) -> Result<Map, ModelError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading map");

    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let directory = path.parent().unwrap_or_else(|| Path::new(""));

    parse_map(&content, directory)
}

/// Parse a map from TMX text
///
/// `directory` is the directory of the originating document; tileset image
/// paths are resolved against it.
pub fn parse_map(xml: &str, directory: &Path) -> Result<Map, ModelError> {
    let document = roxmltree::Document::parse(xml)?;
    let root = document.root_element();

    if root.tag_name().name() != "map" {
        return Err(ModelError::UnexpectedRoot {
            expected: "map".to_string(),
            found: root.tag_name().name().to_string(),
        });
    }

    Map::read(root, directory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_non_map_root() {
        let result = parse_map("<tileset/>", Path::new("."));
        match result {
            Err(ModelError::UnexpectedRoot { found, .. }) => assert_eq!(found, "tileset"),
            other => panic!("Expected UnexpectedRoot, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        let result = parse_map("<map width=", Path::new("."));
        assert!(matches!(result, Err(ModelError::Xml(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_map("/definitely/not/here.tmx");
        assert!(matches!(result, Err(ModelError::Io { .. })));
    }
}
