//! The top-level map model

use roxmltree::Node;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::layer::Layer;
use crate::object_group::ObjectGroup;
use crate::tileset::Tileset;
use crate::xml::{is_element, required_positive};
use crate::ModelError;

/// Which collection a layer-order entry points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum LayerKind {
    /// Index into [`Map::layers`]
    Tiles(usize),
    /// Index into [`Map::object_groups`]
    Objects(usize),
}

/// Position of a layer or top-level object group in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerOrder {
    /// Position among all layers and object groups, bottom first
    pub position: u32,
    pub kind: LayerKind,
}

/// A complete map; owns everything beneath it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Map {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tilesets: Vec<Tileset>,
    pub layers: Vec<Layer>,
    pub object_groups: Vec<ObjectGroup>,
    /// Document z-order of `layers` and `object_groups` combined
    pub layer_order: Vec<LayerOrder>,
}

impl Map {
    /// Build a map from its `<map>` element
    ///
    /// `directory` is where the document lives; tileset images are resolved
    /// against it.
    pub fn read(element: Node<'_, '_>, directory: &Path) -> Result<Self, ModelError> {
        let mut map = Self {
            width: required_positive(element, "width")?,
            height: required_positive(element, "height")?,
            tile_width: required_positive(element, "tilewidth")?,
            tile_height: required_positive(element, "tileheight")?,
            tilesets: Vec::new(),
            layers: Vec::new(),
            object_groups: Vec::new(),
            layer_order: Vec::new(),
        };

        for node in element.children().filter(|n| is_element(*n)) {
            match node.tag_name().name() {
                "tileset" => {
                    let tileset = Tileset::read(node, directory)?;
                    map.ensure_unique_firstgid(&tileset)?;
                    map.tilesets.push(tileset);
                }
                "layer" => {
                    map.push_order(LayerKind::Tiles(map.layers.len()));
                    map.layers.push(Layer::read(node)?);
                }
                "objectgroup" => {
                    map.push_order(LayerKind::Objects(map.object_groups.len()));
                    map.object_groups.push(ObjectGroup::read(node)?);
                }
                _ => {}
            }
        }

        debug!(
            width = map.width,
            height = map.height,
            tilesets = map.tilesets.len(),
            layers = map.layers.len(),
            object_groups = map.object_groups.len(),
            "read map"
        );

        Ok(map)
    }

    fn ensure_unique_firstgid(&self, tileset: &Tileset) -> Result<(), ModelError> {
        match self.tilesets.iter().find(|t| t.firstgid == tileset.firstgid) {
            Some(existing) => Err(ModelError::DuplicateFirstGid {
                first: existing.name.clone(),
                second: tileset.name.clone(),
                firstgid: tileset.firstgid,
            }),
            None => Ok(()),
        }
    }

    fn push_order(&mut self, kind: LayerKind) {
        let position = self.layer_order.len() as u32;
        self.layer_order.push(LayerOrder { position, kind });
    }

    /// The tileset owning a global tile id: the greatest `firstgid <= gid`
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&Tileset> {
        self.tilesets
            .iter()
            .filter(|t| t.firstgid <= gid)
            .max_by_key(|t| t.firstgid)
    }

    /// Every object group in the map, including those nested in tiles
    pub fn all_object_groups(&self) -> impl Iterator<Item = &ObjectGroup> {
        self.object_groups.iter().chain(
            self.tilesets
                .iter()
                .flat_map(|t| t.tiles.iter())
                .filter_map(|tile| tile.object_group.as_ref()),
        )
    }
}
