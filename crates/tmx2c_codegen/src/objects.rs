//! Object and property type definitions (`object.h`)
//!
//! Emitted after every map so the object kind enumeration covers the tags
//! of all of them.

use tmx2c_core::PropertyValue;

use crate::files::FileManager;
use crate::object_types::ObjectTypes;
use crate::paths::OBJECT_HEADER;
use crate::stream::Writer;
use crate::symbols::{
    COLOR, OBJECT, OBJECT_GROUP, OBJECT_TYPE, POINT, POLYGON, PROPERTY, PROPERTY_TYPE,
};
use crate::OBJECT_TYPE_NONE;

/// Members of the property kind enumeration, in declaration order
pub const PROPERTY_KINDS: [&str; 7] = [
    "TILED_OBJECT_PROPERTY_TYPE_STRING",
    "TILED_OBJECT_PROPERTY_TYPE_INT",
    "TILED_OBJECT_PROPERTY_TYPE_OBJECT",
    "TILED_OBJECT_PROPERTY_TYPE_FILE",
    "TILED_OBJECT_PROPERTY_TYPE_FLOAT",
    "TILED_OBJECT_PROPERTY_TYPE_COLOR",
    "TILED_OBJECT_PROPERTY_TYPE_BOOL",
];

/// Union tag and union field that hold a property payload
pub fn property_slot(value: &PropertyValue) -> (&'static str, &'static str) {
    match value {
        PropertyValue::String(_) => (PROPERTY_KINDS[0], "string_value"),
        PropertyValue::Int(_) => (PROPERTY_KINDS[1], "int_value"),
        PropertyValue::Object(_) => (PROPERTY_KINDS[2], "uint32_value"),
        PropertyValue::File(_) => (PROPERTY_KINDS[3], "string_value"),
        PropertyValue::Float(_) => (PROPERTY_KINDS[4], "float_value"),
        PropertyValue::Color(_) => (PROPERTY_KINDS[5], "color_value"),
        PropertyValue::Bool(_) => (PROPERTY_KINDS[6], "bool_value"),
    }
}

/// Emit the object-side types and commit `object.h`
pub fn generate_object_types(fm: &mut FileManager, object_types: &ObjectTypes) {
    fm.require("<stdint.h>");
    fm.require("<stdbool.h>");

    let object_type = fm.define(OBJECT_TYPE);
    let members: Vec<&str> = std::iter::once(OBJECT_TYPE_NONE)
        .chain(object_types.iter().map(|(_, identifier)| identifier))
        .collect();
    fm.block(
        &format!("{object_type} {{\n"),
        |fm| write_members(fm, &members),
        "};\n\n",
    );

    let property_type = fm.define(PROPERTY_TYPE);
    fm.block(
        &format!("{property_type} {{\n"),
        |fm| write_members(fm, &PROPERTY_KINDS),
        "};\n\n",
    );

    let color = fm.define(COLOR);
    fm.block(
        &format!("{color} {{\n"),
        |fm| {
            fm.write("uint8_t r;\n");
            fm.write("uint8_t g;\n");
            fm.write("uint8_t b;\n");
            fm.write("uint8_t a;\n");
        },
        "};\n\n",
    );

    let property = fm.define(PROPERTY);
    fm.block(
        &format!("{property} {{\n"),
        |fm| {
            fm.write("const char* name;\n");
            fm.write(&format!("{property_type} type;\n"));
            fm.block(
                "union {\n",
                |fm| {
                    fm.write(&format!("{color} color_value;\n"));
                    fm.write("/** STRING and FILE */\n");
                    fm.write("const char* string_value;\n");
                    fm.write("int64_t int_value;\n");
                    fm.write("/** OBJECT: id of the referenced object */\n");
                    fm.write("uint32_t uint32_value;\n");
                    fm.write("float float_value;\n");
                    fm.write("bool bool_value;\n");
                },
                "} data;\n",
            );
        },
        "};\n\n",
    );

    let object = fm.define(OBJECT);
    fm.block(
        &format!("{object} {{\n"),
        |fm| {
            fm.write("uint32_t id;\n");
            fm.write("/** Global tile id, or UINT32_MAX when the object is not a tile */\n");
            fm.write("uint32_t gid;\n");
            fm.write("int32_t position[2];\n");
            fm.write("uint32_t size[2];\n");
            fm.write(&format!("{object_type} type;\n"));
            fm.write("uint32_t property_count;\n");
            fm.write(&format!("{property}* properties;\n"));
        },
        "};\n\n",
    );

    let point = fm.define(POINT);
    fm.block(
        &format!("{point} {{\n"),
        |fm| {
            fm.write("float x;\n");
            fm.write("float y;\n");
        },
        "};\n\n",
    );

    let polygon = fm.define(POLYGON);
    fm.block(
        &format!("{polygon} {{\n"),
        |fm| {
            fm.write("uint32_t id;\n");
            fm.write("int32_t position[2];\n");
            fm.write(&format!("{object_type} type;\n"));
            fm.write("/** Relative to `position` */\n");
            fm.write("uint32_t point_count;\n");
            fm.write(&format!("{point}* points;\n"));
            fm.write("uint32_t property_count;\n");
            fm.write(&format!("{property}* properties;\n"));
        },
        "};\n\n",
    );

    let group = fm.define(OBJECT_GROUP);
    fm.block(
        &format!("{group} {{\n"),
        |fm| {
            fm.write("uint32_t id;\n");
            fm.write("/** NULL when unnamed */\n");
            fm.write("const char* name;\n");
            fm.write("uint32_t object_count;\n");
            fm.write(&format!("{object}* objects;\n"));
            fm.write("uint32_t polygon_count;\n");
            fm.write(&format!("{polygon}* polygons;\n"));
        },
        "};\n",
    );

    fm.commit(OBJECT_HEADER);
}

fn write_members(fm: &mut FileManager, members: &[&str]) {
    for (i, member) in members.iter().enumerate() {
        let separator = if i + 1 < members.len() { "," } else { "" };
        fm.write(&format!("{member}{separator}\n"));
    }
}
