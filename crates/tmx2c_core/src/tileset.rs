//! Tileset configuration with per-tile metadata

use roxmltree::Node;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::object_group::ObjectGroup;
use crate::property::{read_optional_properties, Properties};
use crate::xml::{child, children, required_child, required_int, required_str};
use crate::ModelError;

/// The atlas image backing a tileset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TilesetImage {
    /// Path as written in the document, relative to the map
    pub source: String,
    pub width: u32,
    pub height: u32,
}

/// A tile that carries metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    /// Tileset-local id
    pub id: u32,
    /// Collision shapes and other objects attached to the tile
    pub object_group: Option<ObjectGroup>,
    pub properties: Properties,
}

/// A tile atlas referenced by global tile ids starting at `firstgid`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tileset {
    pub name: String,
    pub firstgid: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
    pub tile_count: u32,
    pub image: TilesetImage,
    /// Only tiles with metadata are present; never more than `tile_count`
    pub tiles: Vec<Tile>,
}

impl Tileset {
    /// Build a tileset from a `<tileset>` element
    ///
    /// The image must be readable relative to `directory`.
    pub fn read(element: Node<'_, '_>, directory: &Path) -> Result<Self, ModelError> {
        let image = read_image(required_child(element, "image")?)?;
        ensure_readable(&directory.join(&image.source))?;

        let name = required_str(element, "name")?.to_string();
        let tile_count = required_int(element, "tilecount")?;

        let tiles = children(element, "tile")
            .map(read_tile)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        if let Some(tile) = tiles.iter().find(|tile| !seen.insert(tile.id)) {
            return Err(ModelError::DuplicateTileId {
                tileset: name,
                id: tile.id,
            });
        }

        if tiles.len() > tile_count as usize {
            return Err(ModelError::TooManyTiles {
                name,
                tile_count,
                described: tiles.len(),
            });
        }

        debug!(tileset = %name, tiles = tiles.len(), "read tileset");

        Ok(Self {
            firstgid: required_int(element, "firstgid")?,
            tile_width: required_int(element, "tilewidth")?,
            tile_height: required_int(element, "tileheight")?,
            columns: required_int(element, "columns")?,
            tile_count,
            image,
            tiles,
            name,
        })
    }
}

fn read_image(element: Node<'_, '_>) -> Result<TilesetImage, ModelError> {
    Ok(TilesetImage {
        source: required_str(element, "source")?.to_string(),
        width: required_int(element, "width")?,
        height: required_int(element, "height")?,
    })
}

fn read_tile(element: Node<'_, '_>) -> Result<Tile, ModelError> {
    let object_group = match child(element, "objectgroup") {
        Some(group) => Some(ObjectGroup::read(group)?),
        None => None,
    };

    Ok(Tile {
        id: required_int(element, "id")?,
        object_group,
        properties: read_optional_properties(element)?,
    })
}

fn ensure_readable(path: &Path) -> Result<(), ModelError> {
    std::fs::File::open(path)
        .map(drop)
        .map_err(|source| ModelError::UnreadableImage {
            path: path.to_path_buf(),
            source,
        })
}
