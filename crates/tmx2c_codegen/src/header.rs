//! Map-level type definitions (`tiled.h`)

use crate::files::FileManager;
use crate::paths::TILED_HEADER;
use crate::stream::Writer;
use crate::symbols::{
    LAYER, LAYER_INDEX, LAYER_KIND, MAP, OBJECT_GROUP, PROPERTY, TILESET, TILESET_TILE,
};

/// Emit the map, tileset, layer and layer-index types and commit `tiled.h`
pub fn generate_map_types(fm: &mut FileManager) {
    fm.require("<stdint.h>");
    let group = fm.require(OBJECT_GROUP);
    let property = fm.require(PROPERTY);

    let tile = fm.define(TILESET_TILE);
    fm.block(
        &format!("{tile} {{\n"),
        |fm| {
            fm.write("/** Tileset-local id */\n");
            fm.write("uint32_t id;\n");
            fm.write("/** Optional; NULL when the tile has no objects */\n");
            fm.write(&format!("{group}* object_group;\n"));
            fm.write("uint32_t property_count;\n");
            fm.write(&format!("{property}* properties;\n"));
        },
        "};\n\n",
    );

    let tileset = fm.define(TILESET);
    fm.block(
        &format!("{tileset} {{\n"),
        |fm| {
            fm.write("const char* name;\n");
            fm.write("/** Image path relative to the map file */\n");
            fm.write("const char* source;\n");
            fm.write("uint32_t image_width;\n");
            fm.write("uint32_t image_height;\n");
            fm.write("uint32_t tile_width;\n");
            fm.write("uint32_t tile_height;\n");
            fm.write("uint32_t columns;\n");
            fm.write("uint32_t firstgid;\n");
            fm.write("/** Number of tiles in the image */\n");
            fm.write("uint32_t tile_count;\n");
            fm.write("/** Number of entries in `tiles`; only tiles with metadata are listed */\n");
            fm.write("uint32_t tile_metadata_count;\n");
            fm.write(&format!("{tile}* tiles;\n"));
        },
        "};\n\n",
    );

    let layer = fm.define(LAYER);
    fm.block(
        &format!("{layer} {{\n"),
        |fm| {
            fm.write("uint32_t id;\n");
            fm.write("const char* name;\n");
            fm.write("uint32_t width;\n");
            fm.write("uint32_t height;\n");
            fm.write("/** `width * height` global tile ids, row-major */\n");
            fm.write("uint32_t* data;\n");
            fm.write("uint32_t property_count;\n");
            fm.write(&format!("{property}* properties;\n"));
        },
        "};\n\n",
    );

    let kind = fm.define(LAYER_KIND);
    fm.block(
        &format!("{kind} {{\n"),
        |fm| {
            fm.write("TILED_LAYER_KIND_TILES,\n");
            fm.write("TILED_LAYER_KIND_OBJECT_GROUP\n");
        },
        "};\n\n",
    );

    let index = fm.define(LAYER_INDEX);
    fm.block(
        &format!("{index} {{\n"),
        |fm| {
            fm.write("/** Position among layers and object groups, bottom first */\n");
            fm.write("uint32_t index;\n");
            fm.write(&format!("{kind} kind;\n"));
            fm.write(&format!("/** `{layer}*` or `{group}*` depending on `kind` */\n"));
            fm.write("void* layer;\n");
        },
        "};\n\n",
    );

    let map = fm.define(MAP);
    fm.block(
        &format!("{map} {{\n"),
        |fm| {
            fm.write("uint32_t width;\n");
            fm.write("uint32_t height;\n");
            fm.write("uint32_t tile_width;\n");
            fm.write("uint32_t tile_height;\n");
            fm.write("uint32_t tileset_count;\n");
            fm.write("/**\n");
            fm.write(" * Sorted by descending `firstgid`: the first tileset whose\n");
            fm.write(" * `firstgid` is not above a global tile id owns that tile.\n");
            fm.write(" */\n");
            fm.write(&format!("{tileset}* tilesets;\n"));
            fm.write("uint32_t layer_count;\n");
            fm.write(&format!("{layer}* layers;\n"));
            fm.write("uint32_t object_group_count;\n");
            fm.write(&format!("{group}** object_groups;\n"));
            fm.write("uint32_t layer_index_count;\n");
            fm.write(&format!("{index}* layer_indices;\n"));
        },
        "};\n",
    );

    fm.commit(TILED_HEADER);
}
