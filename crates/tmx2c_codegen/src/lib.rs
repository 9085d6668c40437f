//! tmx2c_codegen - C source generation for Tiled maps
//!
//! This crate turns loaded [`tmx2c_core::Map`] models into a self-contained C
//! library:
//!
//! - **Shared types** - `tiled.h` and `object.h` describing maps, layers, objects
//! - **Per-map constructors** - `maps/<name>.c` building each map on the heap
//! - **Smoke test** - `test.c` allocating and freeing every generated map
//! - **Build descriptor** - `CMakeLists.txt` for the library and the test
//!
//! Includes between generated files are never written by hand. Every emitter
//! declares the symbols it defines and requires on a [`FileManager`], which
//! resolves them into `#include` directives once all files are drafted.
//!
//! # Example
//!
//! ```rust,ignore
//! use tmx2c_codegen::{generate, write_files, CodegenConfig, MapTarget};
//!
//! let map = tmx2c_core::load_map("levels/first.tmx")?;
//! let targets = vec![MapTarget::new("first", map)];
//! let files = generate(&targets, &CodegenConfig::new("maps"))?;
//! write_files(&files, Path::new("generated"), false)?;
//! ```

pub mod cmake;
pub mod config;
pub mod files;
pub mod generator;
pub mod header;
pub mod map_file;
pub mod object_types;
pub mod objects;
pub mod stream;

pub use config::{CodegenConfig, MapEntry, ProjectFile};
pub use files::{FileManager, GeneratedFile};
pub use generator::{generate, write_files, CodegenResult, MapTarget};
pub use map_file::MapFunction;
pub use object_types::ObjectTypes;
pub use stream::{CodeStream, Writer};

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Type names shared between generated files
///
/// Emitters pass these to [`FileManager::define`] and [`FileManager::require`].
pub mod symbols {
    pub const MAP: &str = "struct tiled_map_t";
    pub const TILESET: &str = "struct tiled_tileset_t";
    pub const TILESET_TILE: &str = "struct tiled_tileset_tile_t";
    pub const LAYER: &str = "struct tiled_layer_t";
    pub const LAYER_KIND: &str = "enum tiled_layer_kind_t";
    pub const LAYER_INDEX: &str = "struct tiled_layer_index_t";
    pub const OBJECT_TYPE: &str = "enum tiled_object_type_t";
    pub const PROPERTY_TYPE: &str = "enum tiled_object_property_type_t";
    pub const COLOR: &str = "struct tiled_color_t";
    pub const PROPERTY: &str = "struct tiled_object_property_t";
    pub const OBJECT: &str = "struct tiled_object_t";
    pub const POINT: &str = "struct tiled_point_t";
    pub const POLYGON: &str = "struct tiled_polygon_t";
    pub const OBJECT_GROUP: &str = "struct tiled_object_group_t";
}

/// Paths of the generated files, relative to the output directory
pub mod paths {
    pub const TILED_HEADER: &str = "tiled.h";
    pub const OBJECT_HEADER: &str = "object.h";
    pub const MAPS_DIR: &str = "maps";
    pub const TEST_SOURCE: &str = "test.c";
    pub const BUILD_DESCRIPTOR: &str = "CMakeLists.txt";
}

/// Enum member for objects without a kind tag
pub const OBJECT_TYPE_NONE: &str = "TILED_OBJECT_TYPE_NONE";

const OBJECT_TYPE_PREFIX: &str = "TILED_OBJECT_TYPE_";

static SCIENTIFIC_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)[eE][+-]?[0-9]+$").expect("valid literal pattern")
});

static FRACTIONAL_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[0-9]+$").expect("valid literal pattern"));

/// Errors that can occur during code generation
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unresolved symbol `{symbol}` required by {file}")]
    UnresolvedSymbol { file: String, symbol: String },

    #[error("Object types `{first}` and `{second}` both map to {identifier}")]
    ObjectTypeCollision {
        first: String,
        second: String,
        identifier: String,
    },

    #[error("Object type `{0}` was not collected before emission")]
    UnknownObjectType(String),

    #[error("Invalid map name `{0}`: must be a C identifier")]
    InvalidMapName(String),

    #[error("Map name `{0}` is used more than once")]
    DuplicateMapName(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<toml::de::Error> for CodegenError {
    fn from(err: toml::de::Error) -> Self {
        CodegenError::ConfigError(err.to_string())
    }
}

/// Render decimal text as a single-precision C literal
///
/// Adds a fractional part only when the text has none and is not in
/// exponential form, then appends the `f` suffix.
pub fn c_float_literal(text: &str) -> String {
    let text = text.trim();
    let mut literal = text.to_string();

    if !SCIENTIFIC_LITERAL.is_match(text) {
        if text.ends_with('.') {
            literal.push('0');
        } else if !FRACTIONAL_LITERAL.is_match(text) {
            literal.push_str(".0");
        }
    }

    literal.push('f');
    literal
}

/// Enum member for an object kind tag
///
/// `npcGuard` becomes `TILED_OBJECT_TYPE_NPC_GUARD`. Characters that cannot
/// appear in a C identifier become `_`.
pub fn object_type_identifier(tag: Option<&str>) -> String {
    let Some(tag) = tag else {
        return OBJECT_TYPE_NONE.to_string();
    };

    let mut identifier = String::from(OBJECT_TYPE_PREFIX);
    let mut previous_lower = false;
    for c in tag.chars() {
        if c.is_ascii_uppercase() && previous_lower {
            identifier.push('_');
        }
        if c.is_ascii_alphanumeric() {
            identifier.push(c.to_ascii_uppercase());
        } else {
            identifier.push('_');
        }
        previous_lower = c.is_ascii_lowercase();
    }
    identifier
}

/// Quote text as a C string literal
///
/// Bytes outside printable ASCII are written as three-digit octal escapes.
/// `?` is escaped so no trigraph can form.
pub fn c_string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for byte in text.bytes() {
        match byte {
            b'"' => literal.push_str("\\\""),
            b'\\' => literal.push_str("\\\\"),
            b'?' => literal.push_str("\\?"),
            b'\n' => literal.push_str("\\n"),
            b'\r' => literal.push_str("\\r"),
            b'\t' => literal.push_str("\\t"),
            0x20..=0x7e => literal.push(byte as char),
            _ => literal.push_str(&format!("\\{byte:03o}")),
        }
    }
    literal.push('"');
    literal
}

/// Whether `name` can be used as a C identifier
pub fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Include guard macro for a generated header path
pub fn header_guard(path: &str) -> String {
    let mut guard = String::from("TILED_GENERATED_");
    let mut in_separator = false;
    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            guard.push(c.to_ascii_uppercase());
            in_separator = false;
        } else if !in_separator {
            guard.push('_');
            in_separator = true;
        }
    }
    guard.push_str("_H_");
    guard
}

/// Path of `target` as seen from the directory containing `from`
///
/// Both paths are relative to the output directory and use `/` separators.
pub fn relative_include(from: &str, target: &str) -> String {
    let from_dir: Vec<&str> = from.split('/').collect();
    let from_dir = &from_dir[..from_dir.len() - 1];
    let target_parts: Vec<&str> = target.split('/').collect();

    let common = from_dir
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();
    // Never consume the file name itself
    let common = common.min(target_parts.len() - 1);

    let mut parts: Vec<&str> = vec![".."; from_dir.len() - common];
    parts.extend(&target_parts[common..]);
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_float_literal() {
        assert_eq!(c_float_literal("1"), "1.0f");
        assert_eq!(c_float_literal("-3"), "-3.0f");
        assert_eq!(c_float_literal("1.5"), "1.5f");
        assert_eq!(c_float_literal("16.25"), "16.25f");
        assert_eq!(c_float_literal("2."), "2.0f");
        assert_eq!(c_float_literal(".5"), ".5f");
        assert_eq!(c_float_literal("1e3"), "1e3f");
        assert_eq!(c_float_literal("1.25e-12"), "1.25e-12f");
        assert_eq!(c_float_literal("-7.125E+4"), "-7.125E+4f");
    }

    #[test]
    fn test_object_type_identifier() {
        assert_eq!(object_type_identifier(None), "TILED_OBJECT_TYPE_NONE");
        assert_eq!(object_type_identifier(Some("npc")), "TILED_OBJECT_TYPE_NPC");
        assert_eq!(object_type_identifier(Some("NPC")), "TILED_OBJECT_TYPE_NPC");
        assert_eq!(
            object_type_identifier(Some("npcGuard")),
            "TILED_OBJECT_TYPE_NPC_GUARD"
        );
        assert_eq!(
            object_type_identifier(Some("SpawnPoint")),
            "TILED_OBJECT_TYPE_SPAWN_POINT"
        );
        assert_eq!(
            object_type_identifier(Some("door-2 lock")),
            "TILED_OBJECT_TYPE_DOOR_2_LOCK"
        );
    }

    #[test]
    fn test_c_string_literal() {
        assert_eq!(c_string_literal("Ground"), "\"Ground\"");
        assert_eq!(c_string_literal("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(c_string_literal("line\nnext"), "\"line\\nnext\"");
        assert_eq!(c_string_literal("??="), "\"\\?\\?=\"");
        assert_eq!(c_string_literal("é"), "\"\\303\\251\"");
        assert_eq!(c_string_literal(""), "\"\"");
    }

    #[test]
    fn test_is_c_identifier() {
        assert!(is_c_identifier("level_1"));
        assert!(is_c_identifier("_hidden"));
        assert!(!is_c_identifier("1level"));
        assert!(!is_c_identifier("my-map"));
        assert!(!is_c_identifier(""));
    }

    #[test]
    fn test_header_guard() {
        assert_eq!(header_guard("tiled.h"), "TILED_GENERATED_TILED_H_H_");
        assert_eq!(header_guard("maps/first.h"), "TILED_GENERATED_MAPS_FIRST_H_H_");
    }

    #[test]
    fn test_relative_include() {
        assert_eq!(relative_include("maps/a.c", "maps/a.h"), "a.h");
        assert_eq!(relative_include("maps/a.h", "tiled.h"), "../tiled.h");
        assert_eq!(relative_include("test.c", "maps/a.h"), "maps/a.h");
        assert_eq!(relative_include("tiled.h", "object.h"), "object.h");
    }
}
