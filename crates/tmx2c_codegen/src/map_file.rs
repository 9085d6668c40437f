//! Per-map constructor and destructor (`maps/<name>.h`, `maps/<name>.c`)
//!
//! The constructor rebuilds the map on the heap with `calloc` only. Every
//! pointer starts out NULL, so on any failed allocation the constructor can
//! hand the half-built map to the destructor and return NULL. Counts are set
//! only once their array exists.

use tmx2c_core::{
    Layer, LayerKind, Map, Object, ObjectGroup, Polygon, Properties, PropertyValue, Tile, Tileset,
};

use crate::files::FileManager;
use crate::generator::MapTarget;
use crate::object_types::ObjectTypes;
use crate::objects::property_slot;
use crate::paths::{MAPS_DIR, TEST_SOURCE};
use crate::stream::Writer;
use crate::symbols::{
    LAYER, LAYER_INDEX, LAYER_KIND, MAP, OBJECT, OBJECT_GROUP, OBJECT_TYPE, POINT, POLYGON,
    PROPERTY, PROPERTY_TYPE, TILESET, TILESET_TILE,
};
use crate::{c_float_literal, c_string_literal, CodegenError};

/// Tile ids per line in layer grid initializers
const VALUES_PER_LINE: usize = 16;

/// The functions generated for every map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFunction {
    /// `tiled_<name>_alloc`: builds the map, or returns NULL
    Allocate,
    /// `tiled_<name>_free`: releases the map and nulls the caller's pointer
    Deallocate,
}

impl MapFunction {
    pub const ALL: [MapFunction; 2] = [MapFunction::Allocate, MapFunction::Deallocate];

    pub fn name(self, map_name: &str) -> String {
        match self {
            MapFunction::Allocate => format!("tiled_{map_name}_alloc"),
            MapFunction::Deallocate => format!("tiled_{map_name}_free"),
        }
    }

    /// C prototype, without the trailing `;`
    pub fn declaration(self, map_name: &str) -> String {
        match self {
            MapFunction::Allocate => format!("{MAP}* {}(void)", self.name(map_name)),
            MapFunction::Deallocate => format!("void {}({MAP}** map_ptr)", self.name(map_name)),
        }
    }

    fn emit_body(
        self,
        fm: &mut FileManager,
        target: &MapTarget,
        object_types: &ObjectTypes,
    ) -> Result<(), CodegenError> {
        match self {
            MapFunction::Allocate => emit_allocate(fm, target, object_types),
            MapFunction::Deallocate => {
                emit_deallocate(fm);
                Ok(())
            }
        }
    }
}

/// Emit and commit the header and source for one map
pub fn generate_map_files(
    fm: &mut FileManager,
    target: &MapTarget,
    object_types: &ObjectTypes,
) -> Result<(), CodegenError> {
    fm.require(MAP);
    for function in MapFunction::ALL {
        let name = function.name(&target.name);
        fm.define(&name);
        fm.write(&format!("{};\n", function.declaration(&target.name)));
    }
    fm.commit(format!("{MAPS_DIR}/{}.h", target.name));

    for function in MapFunction::ALL {
        fm.require(&function.name(&target.name));
    }
    for (i, function) in MapFunction::ALL.into_iter().enumerate() {
        if i > 0 {
            fm.write("\n");
        }
        fm.try_block(
            &format!("{} {{\n", function.declaration(&target.name)),
            |fm| function.emit_body(fm, target, object_types),
            "}\n",
        )?;
    }
    fm.commit(format!("{MAPS_DIR}/{}.c", target.name));

    Ok(())
}

/// Tilesets in emission order: descending `firstgid`
pub fn tileset_order(map: &Map) -> Vec<&Tileset> {
    let mut tilesets: Vec<&Tileset> = map.tilesets.iter().collect();
    tilesets.sort_by(|a, b| b.firstgid.cmp(&a.firstgid));
    tilesets
}

/// Statements storing one property payload into `slot`
pub fn property_assignments(slot: &str, value: &PropertyValue) -> Vec<String> {
    let (tag, field) = property_slot(value);
    let mut lines = vec![format!("{slot}.type = {tag};")];

    match value {
        PropertyValue::String(text) | PropertyValue::File(text) => {
            lines.push(format!("{slot}.data.{field} = {};", c_string_literal(text)));
        }
        PropertyValue::Int(text) => {
            let literal = match text.parse::<i64>() {
                Ok(i64::MIN) => "INT64_MIN".to_string(),
                Ok(number) => number.to_string(),
                Err(_) => text.clone(),
            };
            lines.push(format!("{slot}.data.{field} = {literal};"));
        }
        PropertyValue::Float(text) => {
            lines.push(format!("{slot}.data.{field} = {};", c_float_literal(text)));
        }
        PropertyValue::Bool(flag) => {
            lines.push(format!("{slot}.data.{field} = {flag};"));
        }
        PropertyValue::Object(id) => {
            lines.push(format!("{slot}.data.{field} = {id};"));
        }
        PropertyValue::Color(color) => {
            let channels = [("r", color.r), ("g", color.g), ("b", color.b), ("a", color.a)];
            for (channel, byte) in channels {
                lines.push(format!("{slot}.data.{field}.{channel} = {byte};"));
            }
        }
    }

    lines
}

struct Emitter<'a> {
    /// Destructor called on the partial map when an allocation fails
    free: &'a str,
    object_types: &'a ObjectTypes,
}

fn emit_allocate(
    fm: &mut FileManager,
    target: &MapTarget,
    object_types: &ObjectTypes,
) -> Result<(), CodegenError> {
    let free = MapFunction::Deallocate.name(&target.name);
    let emitter = Emitter {
        free: &free,
        object_types,
    };
    let map = &target.map;

    fm.require("<stdlib.h>");
    let map_type = fm.require(MAP);
    fm.write(&format!("{map_type}* map = calloc(1, sizeof({map_type}));\n"));
    fm.write("if(!map) return NULL;\n");
    fm.write(&format!("map->width = {};\n", map.width));
    fm.write(&format!("map->height = {};\n", map.height));
    fm.write(&format!("map->tile_width = {};\n", map.tile_width));
    fm.write(&format!("map->tile_height = {};\n", map.tile_height));

    emitter.tilesets(fm, map)?;
    emitter.layers(fm, map);
    emitter.object_groups(fm, map)?;
    emitter.layer_indices(fm, map);

    fm.write("return map;\n");
    Ok(())
}

impl Emitter<'_> {
    /// `pointer = calloc(...)` followed by the failure check
    fn allocate(&self, fm: &mut FileManager, pointer: &str, length: usize, element: &str) {
        fm.require("<stdlib.h>");
        fm.write(&format!("{pointer} = calloc({length}, sizeof({element}));\n"));
        fm.block(
            &format!("if(!{pointer}) {{\n"),
            |fm| {
                fm.write(&format!("{}(&map);\n", self.free));
                fm.write("return NULL;\n");
            },
            "}\n",
        );
    }

    /// Allocate an array and record its length; nothing for empty arrays
    fn array(
        &self,
        fm: &mut FileManager,
        pointer: &str,
        count: &str,
        length: usize,
        element: &str,
    ) {
        if length == 0 {
            return;
        }
        self.allocate(fm, pointer, length, element);
        fm.write(&format!("{count} = {length};\n"));
    }

    fn tilesets(&self, fm: &mut FileManager, map: &Map) -> Result<(), CodegenError> {
        let tilesets = tileset_order(map);
        let tileset_type = fm.require(TILESET);
        self.array(fm, "map->tilesets", "map->tileset_count", tilesets.len(), tileset_type);

        for (i, tileset) in tilesets.into_iter().enumerate() {
            fm.try_block("{\n", |fm| self.tileset(fm, i, tileset), "}\n")?;
        }
        Ok(())
    }

    fn tileset(
        &self,
        fm: &mut FileManager,
        i: usize,
        tileset: &Tileset,
    ) -> Result<(), CodegenError> {
        let tileset_type = fm.require(TILESET);
        fm.write(&format!("{tileset_type}* tileset = &map->tilesets[{i}];\n"));
        fm.write(&format!("tileset->name = {};\n", c_string_literal(&tileset.name)));
        fm.write(&format!(
            "tileset->source = {};\n",
            c_string_literal(&tileset.image.source)
        ));
        fm.write(&format!("tileset->image_width = {};\n", tileset.image.width));
        fm.write(&format!("tileset->image_height = {};\n", tileset.image.height));
        fm.write(&format!("tileset->tile_width = {};\n", tileset.tile_width));
        fm.write(&format!("tileset->tile_height = {};\n", tileset.tile_height));
        fm.write(&format!("tileset->columns = {};\n", tileset.columns));
        fm.write(&format!("tileset->firstgid = {};\n", tileset.firstgid));
        fm.write(&format!("tileset->tile_count = {};\n", tileset.tile_count));

        let tile_type = fm.require(TILESET_TILE);
        self.array(
            fm,
            "tileset->tiles",
            "tileset->tile_metadata_count",
            tileset.tiles.len(),
            tile_type,
        );
        for (j, tile) in tileset.tiles.iter().enumerate() {
            fm.try_block("{\n", |fm| self.tile(fm, j, tile), "}\n")?;
        }
        Ok(())
    }

    fn tile(&self, fm: &mut FileManager, j: usize, tile: &Tile) -> Result<(), CodegenError> {
        let tile_type = fm.require(TILESET_TILE);
        fm.write(&format!("{tile_type}* tile = &tileset->tiles[{j}];\n"));
        fm.write(&format!("tile->id = {};\n", tile.id));
        if let Some(group) = &tile.object_group {
            self.object_group(fm, "tile->object_group", group)?;
        }
        self.properties(fm, "tile->properties", "tile->property_count", &tile.properties);
        Ok(())
    }

    fn layers(&self, fm: &mut FileManager, map: &Map) {
        let layer_type = fm.require(LAYER);
        self.array(fm, "map->layers", "map->layer_count", map.layers.len(), layer_type);

        for (i, layer) in map.layers.iter().enumerate() {
            fm.block("{\n", |fm| self.layer(fm, i, layer), "}\n");
        }
    }

    fn layer(&self, fm: &mut FileManager, i: usize, layer: &Layer) {
        let layer_type = fm.require(LAYER);
        fm.write(&format!("{layer_type}* layer = &map->layers[{i}];\n"));
        fm.write(&format!("layer->id = {};\n", layer.id));
        fm.write(&format!("layer->name = {};\n", c_string_literal(&layer.name)));
        fm.write(&format!("layer->width = {};\n", layer.width));
        fm.write(&format!("layer->height = {};\n", layer.height));

        if !layer.data.is_empty() {
            fm.require("<stdint.h>");
            self.allocate(fm, "layer->data", layer.data.len(), "uint32_t");
            fm.block(
                "{\n",
                |fm| {
                    fm.write(&format!("static const uint32_t tiles[{}] = {{\n", layer.data.len()));
                    fm.indented(|fm| write_tile_grid(fm, &layer.data));
                    fm.write("};\n");
                    fm.require("<string.h>");
                    fm.write("memcpy(layer->data, tiles, sizeof(tiles));\n");
                },
                "}\n",
            );
        }

        self.properties(fm, "layer->properties", "layer->property_count", &layer.properties);
    }

    fn object_groups(&self, fm: &mut FileManager, map: &Map) -> Result<(), CodegenError> {
        let group_type = fm.require(OBJECT_GROUP);
        self.array(
            fm,
            "map->object_groups",
            "map->object_group_count",
            map.object_groups.len(),
            &format!("{group_type}*"),
        );

        for (i, group) in map.object_groups.iter().enumerate() {
            self.object_group(fm, &format!("map->object_groups[{i}]"), group)?;
        }
        Ok(())
    }

    /// Allocate a group record into `pointer` and fill it
    fn object_group(
        &self,
        fm: &mut FileManager,
        pointer: &str,
        group: &ObjectGroup,
    ) -> Result<(), CodegenError> {
        let group_type = fm.require(OBJECT_GROUP);
        self.allocate(fm, pointer, 1, group_type);

        fm.try_block(
            "{\n",
            |fm| {
                fm.write(&format!("{group_type}* group = {pointer};\n"));
                fm.write(&format!("group->id = {};\n", group.id));
                if let Some(name) = &group.name {
                    fm.write(&format!("group->name = {};\n", c_string_literal(name)));
                }

                let object_type = fm.require(OBJECT);
                self.array(
                    fm,
                    "group->objects",
                    "group->object_count",
                    group.objects.len(),
                    object_type,
                );
                for (k, object) in group.objects.iter().enumerate() {
                    fm.try_block("{\n", |fm| self.object(fm, k, object), "}\n")?;
                }

                let polygon_type = fm.require(POLYGON);
                self.array(
                    fm,
                    "group->polygons",
                    "group->polygon_count",
                    group.polygons.len(),
                    polygon_type,
                );
                for (k, polygon) in group.polygons.iter().enumerate() {
                    fm.try_block("{\n", |fm| self.polygon(fm, k, polygon), "}\n")?;
                }
                Ok(())
            },
            "}\n",
        )
    }

    fn object(&self, fm: &mut FileManager, k: usize, object: &Object) -> Result<(), CodegenError> {
        let object_type = fm.require(OBJECT);
        fm.require(OBJECT_TYPE);
        let kind = self.object_types.identifier(object.object_type.as_deref())?;

        fm.write(&format!("{object_type}* object = &group->objects[{k}];\n"));
        fm.write(&format!("object->id = {};\n", object.id));
        match object.gid {
            Some(gid) => fm.write(&format!("object->gid = {gid};\n")),
            None => {
                fm.require("<stdint.h>");
                fm.write("object->gid = UINT32_MAX;\n");
            }
        }
        fm.write(&format!("object->position[0] = {};\n", object.x));
        fm.write(&format!("object->position[1] = {};\n", object.y));
        fm.write(&format!("object->size[0] = {};\n", object.width));
        fm.write(&format!("object->size[1] = {};\n", object.height));
        fm.write(&format!("object->type = {kind};\n"));
        self.properties(fm, "object->properties", "object->property_count", &object.properties);
        Ok(())
    }

    fn polygon(
        &self,
        fm: &mut FileManager,
        k: usize,
        polygon: &Polygon,
    ) -> Result<(), CodegenError> {
        let polygon_type = fm.require(POLYGON);
        fm.require(OBJECT_TYPE);
        let kind = self.object_types.identifier(polygon.object_type.as_deref())?;

        fm.write(&format!("{polygon_type}* polygon = &group->polygons[{k}];\n"));
        fm.write(&format!("polygon->id = {};\n", polygon.id));
        fm.write(&format!("polygon->position[0] = {};\n", polygon.x));
        fm.write(&format!("polygon->position[1] = {};\n", polygon.y));
        fm.write(&format!("polygon->type = {kind};\n"));

        let point_type = fm.require(POINT);
        self.array(
            fm,
            "polygon->points",
            "polygon->point_count",
            polygon.points.len(),
            point_type,
        );
        if !polygon.points.is_empty() {
            fm.block(
                "{\n",
                |fm| {
                    fm.block(
                        &format!(
                            "static const {point_type} points[{}] = {{\n",
                            polygon.points.len()
                        ),
                        |fm| {
                            for (n, point) in polygon.points.iter().enumerate() {
                                let separator = if n + 1 < polygon.points.len() { "," } else { "" };
                                fm.write(&format!(
                                    "{{ {}, {} }}{separator}\n",
                                    c_float_literal(&point.x),
                                    c_float_literal(&point.y)
                                ));
                            }
                        },
                        "};\n",
                    );
                    fm.require("<string.h>");
                    fm.write("memcpy(polygon->points, points, sizeof(points));\n");
                },
                "}\n",
            );
        }

        self.properties(fm, "polygon->properties", "polygon->property_count", &polygon.properties);
        Ok(())
    }

    fn properties(
        &self,
        fm: &mut FileManager,
        pointer: &str,
        count: &str,
        properties: &Properties,
    ) {
        if properties.is_empty() {
            return;
        }
        let property_type = fm.require(PROPERTY);
        fm.require(PROPERTY_TYPE);
        self.array(fm, pointer, count, properties.len(), property_type);

        for (n, (name, value)) in properties.iter().enumerate() {
            let slot = format!("{pointer}[{n}]");
            fm.write(&format!("{slot}.name = {};\n", c_string_literal(name)));
            if matches!(value, PropertyValue::Int(text) if text.parse::<i64>() == Ok(i64::MIN)) {
                fm.require("<stdint.h>");
            }
            for line in property_assignments(&slot, value) {
                fm.write(&format!("{line}\n"));
            }
        }
    }

    fn layer_indices(&self, fm: &mut FileManager, map: &Map) {
        let index_type = fm.require(LAYER_INDEX);
        self.array(
            fm,
            "map->layer_indices",
            "map->layer_index_count",
            map.layer_order.len(),
            index_type,
        );
        fm.require(LAYER_KIND);

        for (n, order) in map.layer_order.iter().enumerate() {
            let slot = format!("map->layer_indices[{n}]");
            let (kind, layer) = match order.kind {
                LayerKind::Tiles(i) => ("TILED_LAYER_KIND_TILES", format!("&map->layers[{i}]")),
                LayerKind::Objects(i) => {
                    ("TILED_LAYER_KIND_OBJECT_GROUP", format!("map->object_groups[{i}]"))
                }
            };
            fm.write(&format!("{slot}.index = {};\n", order.position));
            fm.write(&format!("{slot}.kind = {kind};\n"));
            fm.write(&format!("{slot}.layer = {layer};\n"));
        }
    }
}

/// Comma-separated tile ids, [`VALUES_PER_LINE`] per line
fn write_tile_grid(fm: &mut FileManager, data: &[u32]) {
    for (n, chunk) in data.chunks(VALUES_PER_LINE).enumerate() {
        if n > 0 {
            fm.append(",\n");
        }
        fm.write("");
        for (k, id) in chunk.iter().enumerate() {
            if k > 0 {
                fm.append(", ");
            }
            fm.append(&id.to_string());
        }
    }
    fm.append("\n");
}

/// Release an object group held in `pointer`, then null it
fn free_object_group(fm: &mut FileManager, pointer: &str) {
    fm.block(
        &format!("if({pointer}) {{\n"),
        |fm| {
            fm.write(&format!("{OBJECT_GROUP}* group = {pointer};\n"));
            fm.write("uint32_t k;\n");
            fm.block(
                "if(group->polygons) {\n",
                |fm| {
                    fm.block(
                        "for(k = 0; k < group->polygon_count; k++) {\n",
                        |fm| {
                            release(fm, "group->polygons[k].points");
                            release(fm, "group->polygons[k].properties");
                        },
                        "}\n",
                    );
                    release(fm, "group->polygons");
                },
                "}\n",
            );
            fm.block(
                "if(group->objects) {\n",
                |fm| {
                    fm.block(
                        "for(k = 0; k < group->object_count; k++) {\n",
                        |fm| release(fm, "group->objects[k].properties"),
                        "}\n",
                    );
                    release(fm, "group->objects");
                },
                "}\n",
            );
            fm.write("free(group);\n");
            fm.write(&format!("{pointer} = NULL;\n"));
        },
        "}\n",
    );
}

fn release(fm: &mut FileManager, pointer: &str) {
    fm.write(&format!("free({pointer});\n"));
    fm.write(&format!("{pointer} = NULL;\n"));
}

/// The destructor body is the same for every map: it walks whatever the
/// constructor managed to allocate.
fn emit_deallocate(fm: &mut FileManager) {
    fm.require("<stdlib.h>");
    fm.require("<stdint.h>");
    let map_type = fm.require(MAP);
    let tileset_type = fm.require(TILESET);
    let tile_type = fm.require(TILESET_TILE);
    fm.require(OBJECT_GROUP);
    fm.require(POLYGON);
    fm.require(OBJECT);

    fm.write(&format!("{map_type}* map;\n"));
    fm.write("uint32_t i;\n");
    fm.write("uint32_t j;\n");
    fm.write("if(!map_ptr || !*map_ptr) return;\n");
    fm.write("map = *map_ptr;\n");

    fm.block(
        "if(map->layers) {\n",
        |fm| {
            fm.block(
                "for(i = 0; i < map->layer_count; i++) {\n",
                |fm| {
                    release(fm, "map->layers[i].properties");
                    release(fm, "map->layers[i].data");
                },
                "}\n",
            );
            release(fm, "map->layers");
        },
        "}\n",
    );

    fm.block(
        "if(map->object_groups) {\n",
        |fm| {
            fm.block(
                "for(i = 0; i < map->object_group_count; i++) {\n",
                |fm| free_object_group(fm, "map->object_groups[i]"),
                "}\n",
            );
            release(fm, "map->object_groups");
        },
        "}\n",
    );

    fm.block(
        "if(map->tilesets) {\n",
        |fm| {
            fm.block(
                "for(i = 0; i < map->tileset_count; i++) {\n",
                |fm| {
                    fm.write(&format!("{tileset_type}* tileset = &map->tilesets[i];\n"));
                    fm.block(
                        "if(tileset->tiles) {\n",
                        |fm| {
                            fm.block(
                                "for(j = 0; j < tileset->tile_metadata_count; j++) {\n",
                                |fm| {
                                    fm.write(&format!(
                                        "{tile_type}* tile = &tileset->tiles[j];\n"
                                    ));
                                    free_object_group(fm, "tile->object_group");
                                    release(fm, "tile->properties");
                                },
                                "}\n",
                            );
                            release(fm, "tileset->tiles");
                        },
                        "}\n",
                    );
                },
                "}\n",
            );
            release(fm, "map->tilesets");
        },
        "}\n",
    );

    release(fm, "map->layer_indices");
    fm.write("free(map);\n");
    fm.write("*map_ptr = NULL;\n");
}

/// Emit and commit `test.c`, which builds and frees every map
pub fn generate_test_program(fm: &mut FileManager, targets: &[MapTarget]) {
    fm.require("<assert.h>");
    fm.require("<stddef.h>");
    let map_type = fm.require(MAP);

    let calls: Vec<(String, String)> = targets
        .iter()
        .map(|t| {
            (
                MapFunction::Allocate.name(&t.name),
                MapFunction::Deallocate.name(&t.name),
            )
        })
        .collect();
    for (alloc, free) in &calls {
        fm.require(alloc);
        fm.require(free);
    }

    fm.block(
        "int main(void) {\n",
        |fm| {
            fm.write(&format!("{map_type}* map = NULL;\n"));
            if calls.is_empty() {
                fm.write("(void)map;\n");
            }
            for (alloc, free) in &calls {
                fm.write(&format!("map = {alloc}();\n"));
                fm.write("assert(map != NULL);\n");
                fm.write(&format!("{free}(&map);\n"));
                fm.write("assert(map == NULL);\n");
            }
            fm.write("return 0;\n");
        },
        "}\n",
    );

    fm.commit(TEST_SOURCE);
}
