use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use tmx2c_codegen::{
    generate, write_files, CodegenConfig, CodegenError, FileManager, GeneratedFile, MapTarget,
    Writer,
};
use tmx2c_core::{load_map, parse_map, Layer, Map, Properties};

const LEVEL: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="3" height="2" tilewidth="16" tileheight="16">
 <tileset firstgid="1" name="ground" tilewidth="16" tileheight="16" tilecount="20" columns="5">
  <image source="img/ground.png" width="80" height="64"/>
  <tile id="4">
   <properties><property name="solid" type="bool" value="true"/></properties>
   <objectgroup id="9"><object id="1" type="hitbox" x="0" y="8" width="16" height="8"/></objectgroup>
  </tile>
 </tileset>
 <tileset firstgid="50" name="items" tilewidth="16" tileheight="16" tilecount="4" columns="2">
  <image source="img/items.png" width="32" height="32"/>
 </tileset>
 <tileset firstgid="12" name="walls" tilewidth="16" tileheight="16" tilecount="8" columns="4">
  <image source="img/walls.png" width="64" height="32"/>
 </tileset>
 <layer id="1" name="Ground" width="3" height="2">
  <properties><property name="parallax" type="float" value="2"/></properties>
  <data encoding="base64">
   AQAAAAIAAAADAAAADAAAADIAAAAAAACA
  </data>
 </layer>
 <objectgroup id="2" name="Things">
  <object id="3" type="npcGuard" x="16" y="32" width="16" height="16">
   <properties>
    <property name="label" value="Guard &quot;Bob&quot;"/>
    <property name="hp" type="int" value="25"/>
    <property name="target" type="object" value="4"/>
    <property name="script" type="file" value="ai/guard.lua"/>
    <property name="speed" type="float" value="1.5"/>
    <property name="tint" type="color" value="#80ff0010"/>
    <property name="hostile" type="bool" value="false"/>
   </properties>
  </object>
  <object id="4" gid="51" x="48" y="16" width="16" height="16"/>
  <object id="5" type="trigger" x="0" y="0">
   <properties><property name="once" type="bool" value="true"/></properties>
   <polygon points="0,0 16,0 16.5,-8"/>
  </object>
 </objectgroup>
</map>
"##;

fn write_level(dir: &Path) -> Map {
    fs::create_dir_all(dir.join("img")).unwrap();
    for image in ["ground", "items", "walls"] {
        fs::write(dir.join("img").join(format!("{image}.png")), b"png").unwrap();
    }
    let path = dir.join("level.tmx");
    fs::write(&path, LEVEL).unwrap();
    load_map(&path).unwrap()
}

fn by_path(files: &[GeneratedFile]) -> HashMap<&str, &str> {
    files
        .iter()
        .map(|f| (f.path.as_str(), f.contents.as_str()))
        .collect()
}

/// Every initializer of the form `static const uint32_t tiles[N] = { ... };`
fn emitted_grids(source: &str) -> Vec<Vec<u32>> {
    let mut grids = Vec::new();
    let mut rest = source;
    while let Some(start) = rest.find("static const uint32_t tiles[") {
        let body = &rest[start..];
        let open = body.find('{').unwrap();
        let close = body.find("};").unwrap();
        let values = body[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.parse().unwrap())
            .collect();
        grids.push(values);
        rest = &body[close..];
    }
    grids
}

fn single_layer_map(data: Vec<u32>, width: u32, height: u32) -> Map {
    let mut map = parse_map(
        r#"<map width="1" height="1" tilewidth="8" tileheight="8"/>"#,
        Path::new("."),
    )
    .unwrap();
    map.layers.push(Layer {
        id: 1,
        name: "grid".to_string(),
        width,
        height,
        data,
        properties: Properties::new(),
    });
    map
}

#[test]
fn generated_includes_are_resolved() {
    let temp = tempfile::tempdir().unwrap();
    let map = write_level(temp.path());
    let files = generate(&[MapTarget::new("level", map)], &CodegenConfig::default()).unwrap();
    let files = by_path(&files);

    let source = files["maps/level.c"];
    assert!(source.starts_with("#include \"level.h\"\n"));
    assert!(source.contains("#include \"../tiled.h\"\n"));
    assert!(source.contains("#include \"../object.h\"\n"));
    assert!(source.contains("#include <string.h>\n"));

    let header = files["maps/level.h"];
    assert!(header.contains("#include \"../tiled.h\"\n"));
    assert!(header.contains("struct tiled_map_t* tiled_level_alloc(void);\n"));

    assert!(files["tiled.h"].contains("#include \"object.h\"\n"));
    assert!(!files["object.h"].contains("#include \""));
    assert!(files["test.c"].contains("#include \"maps/level.h\"\n"));
    assert!(files["CMakeLists.txt"].contains("    maps/level.c\n"));
}

#[test]
fn layer_grids_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let level = write_level(temp.path());
    let decoded = level.layers[0].data.clone();
    assert_eq!(decoded, vec![1, 2, 3, 12, 50, 0x8000_0000]);

    let long: Vec<u32> = (0..40).map(|n| n * 7).collect();
    let targets = vec![
        MapTarget::new("level", level),
        MapTarget::new("empty", single_layer_map(Vec::new(), 0, 0)),
        MapTarget::new("single", single_layer_map(vec![42], 1, 1)),
        MapTarget::new("long", single_layer_map(long.clone(), 8, 5)),
    ];
    let files = generate(&targets, &CodegenConfig::default()).unwrap();
    let files = by_path(&files);

    assert_eq!(emitted_grids(files["maps/level.c"]), vec![decoded]);
    assert_eq!(emitted_grids(files["maps/empty.c"]), Vec::<Vec<u32>>::new());
    assert!(!files["maps/empty.c"].contains("layer->data = calloc"));
    assert_eq!(emitted_grids(files["maps/single.c"]), vec![vec![42]]);
    assert_eq!(emitted_grids(files["maps/long.c"]), vec![long]);
}

#[test]
fn property_payloads_match_their_kind() {
    let temp = tempfile::tempdir().unwrap();
    let map = write_level(temp.path());
    let files = generate(&[MapTarget::new("level", map)], &CodegenConfig::default()).unwrap();
    let source = by_path(&files)["maps/level.c"];

    let p = "object->properties";
    let expected = [
        format!("{p}[0].name = \"label\";"),
        format!("{p}[0].type = TILED_OBJECT_PROPERTY_TYPE_STRING;"),
        format!("{p}[0].data.string_value = \"Guard \\\"Bob\\\"\";"),
        format!("{p}[1].type = TILED_OBJECT_PROPERTY_TYPE_INT;"),
        format!("{p}[1].data.int_value = 25;"),
        format!("{p}[2].type = TILED_OBJECT_PROPERTY_TYPE_OBJECT;"),
        format!("{p}[2].data.uint32_value = 4;"),
        format!("{p}[3].type = TILED_OBJECT_PROPERTY_TYPE_FILE;"),
        format!("{p}[3].data.string_value = \"ai/guard.lua\";"),
        format!("{p}[4].type = TILED_OBJECT_PROPERTY_TYPE_FLOAT;"),
        format!("{p}[4].data.float_value = 1.5f;"),
        format!("{p}[5].type = TILED_OBJECT_PROPERTY_TYPE_COLOR;"),
        format!("{p}[5].data.color_value.r = 255;"),
        format!("{p}[5].data.color_value.g = 0;"),
        format!("{p}[5].data.color_value.b = 16;"),
        format!("{p}[5].data.color_value.a = 128;"),
        format!("{p}[6].type = TILED_OBJECT_PROPERTY_TYPE_BOOL;"),
        format!("{p}[6].data.bool_value = false;"),
        "layer->properties[0].data.float_value = 2.0f;".to_string(),
        "tile->properties[0].data.bool_value = true;".to_string(),
        "polygon->properties[0].data.bool_value = true;".to_string(),
        "object->gid = 51;".to_string(),
        "object->gid = UINT32_MAX;".to_string(),
        "object->type = TILED_OBJECT_TYPE_NPC_GUARD;".to_string(),
        "{ 16.5f, -8.0f }".to_string(),
    ];
    for line in expected {
        assert!(source.contains(&line), "missing `{line}`");
    }
}

#[test]
fn tilesets_emitted_by_descending_firstgid() {
    let temp = tempfile::tempdir().unwrap();
    let map = write_level(temp.path());
    let files = generate(&[MapTarget::new("level", map)], &CodegenConfig::default()).unwrap();
    let source = by_path(&files)["maps/level.c"];

    let order: Vec<u32> = source
        .lines()
        .filter_map(|l| l.trim().strip_prefix("tileset->firstgid = "))
        .map(|v| v.trim_end_matches(';').parse().unwrap())
        .collect();
    assert_eq!(order, vec![50, 12, 1]);

    let owner = |gid: u32| order.iter().copied().find(|firstgid| *firstgid <= gid);
    assert_eq!(owner(5), Some(1));
    assert_eq!(owner(25), Some(12));
    assert_eq!(owner(60), Some(50));
}

#[test]
fn object_type_enum_spans_all_maps() {
    let temp = tempfile::tempdir().unwrap();
    let map = write_level(temp.path());
    let other = parse_map(
        r#"<map width="1" height="1" tilewidth="8" tileheight="8">
            <objectgroup id="1"><object id="1" type="door" x="0" y="0" width="1" height="1"/></objectgroup>
        </map>"#,
        Path::new("."),
    )
    .unwrap();

    let files = generate(
        &[MapTarget::new("level", map), MapTarget::new("other", other)],
        &CodegenConfig::default(),
    )
    .unwrap();
    let object_header = by_path(&files)["object.h"];
    assert!(object_header.contains(
        "enum tiled_object_type_t {\n    TILED_OBJECT_TYPE_NONE,\n    TILED_OBJECT_TYPE_NPC_GUARD,\n    TILED_OBJECT_TYPE_TRIGGER,\n    TILED_OBJECT_TYPE_HITBOX,\n    TILED_OBJECT_TYPE_DOOR\n};"
    ));
}

#[test]
fn case_only_tag_difference_fails_generation() {
    let map = |tag: &str| {
        parse_map(
            &format!(
                r#"<map width="1" height="1" tilewidth="8" tileheight="8">
                    <objectgroup id="1"><object id="1" type="{tag}" x="0" y="0" width="1" height="1"/></objectgroup>
                </map>"#
            ),
            Path::new("."),
        )
        .unwrap()
    };

    let result = generate(
        &[MapTarget::new("a", map("npc")), MapTarget::new("b", map("NPC"))],
        &CodegenConfig::default(),
    );
    assert!(matches!(
        result,
        Err(CodegenError::ObjectTypeCollision { .. })
    ));
}

#[test]
fn unresolved_symbol_emits_nothing() {
    let mut fm = FileManager::new();
    fm.define("struct tiled_map_t");
    fm.write("struct tiled_map_t { int x; };\n");
    fm.commit("tiled.h");
    fm.require("struct tiled_missing_t");
    fm.write("struct tiled_missing_t* missing;\n");
    fm.commit("maps/broken.c");

    match fm.finalize() {
        Err(CodegenError::UnresolvedSymbol { file, symbol }) => {
            assert_eq!(file, "maps/broken.c");
            assert_eq!(symbol, "struct tiled_missing_t");
        }
        other => panic!("Expected UnresolvedSymbol, got {:?}", other),
    }
    assert!(fm.finalize().unwrap().is_empty());
}

#[test]
fn every_allocation_can_unwind() {
    let temp = tempfile::tempdir().unwrap();
    let map = write_level(temp.path());
    let files = generate(&[MapTarget::new("level", map)], &CodegenConfig::default()).unwrap();
    let source = by_path(&files)["maps/level.c"];

    let lines: Vec<&str> = source.lines().map(str::trim).collect();
    let mut allocations = 0;
    for (n, line) in lines.iter().enumerate() {
        let Some((pointer, _)) = line.split_once(" = calloc(") else {
            continue;
        };
        allocations += 1;
        if pointer.ends_with(" map") {
            assert_eq!(lines[n + 1], "if(!map) return NULL;");
            continue;
        }
        assert_eq!(lines[n + 1], format!("if(!{pointer}) {{"));
        assert_eq!(lines[n + 2], "tiled_level_free(&map);");
        assert_eq!(lines[n + 3], "return NULL;");
    }
    // map, tilesets, tiles, tile group, tile group objects, tile properties,
    // layers, layer data, layer properties, groups, group, objects,
    // object properties, polygons, points, polygon properties, layer indices
    assert_eq!(allocations, 17);

    // Teardown walks are guarded by the array they index
    let free = &source[source.find("void tiled_level_free").unwrap()..];
    for (guard, walk) in [
        ("if(map->layers) {", "for(i = 0; i < map->layer_count; i++) {"),
        ("if(map->tilesets) {", "for(i = 0; i < map->tileset_count; i++) {"),
        ("if(tileset->tiles) {", "for(j = 0; j < tileset->tile_metadata_count; j++) {"),
        ("if(group->polygons) {", "for(k = 0; k < group->polygon_count; k++) {"),
    ] {
        let guard_at = free.find(guard).unwrap();
        let walk_at = free.find(walk).unwrap();
        assert!(guard_at < walk_at, "{walk} not guarded");
    }
}

#[test]
fn generated_lines_have_no_trailing_whitespace() {
    let temp = tempfile::tempdir().unwrap();
    let map = write_level(temp.path());
    let files = generate(&[MapTarget::new("level", map)], &CodegenConfig::default()).unwrap();

    for file in &files {
        for (n, line) in file.contents.lines().enumerate() {
            assert_eq!(
                line,
                line.trim_end(),
                "{}:{} ends in whitespace",
                file.path,
                n + 1
            );
        }
    }
}

/// Counts calls and fails the call after `calloc_budget` successes
const FAILING_CALLOC: &str = r#"#include <stdlib.h>

int calloc_budget = -1;
int calloc_calls = 0;

void* failing_calloc(size_t count, size_t size) {
    calloc_calls++;
    if(calloc_budget == 0) {
        return NULL;
    }
    if(calloc_budget > 0) {
        calloc_budget--;
    }
    return calloc(count, size);
}
"#;

/// Fails each allocation in turn; prints how many runs failed before one succeeded
const UNWIND_DRIVER: &str = r#"#include <stdio.h>
#include "maps/level.h"

extern int calloc_budget;
extern int calloc_calls;

int main(void) {
    int budget;
    for(budget = 0; budget < 100000; budget++) {
        struct tiled_map_t* map;
        calloc_budget = budget;
        calloc_calls = 0;
        map = tiled_level_alloc();
        if(map) {
            tiled_level_free(&map);
            if(map) return 2;
            tiled_level_free(&map);
            printf("%d\n", budget);
            return 0;
        }
        if(calloc_calls != budget + 1) return 3;
        tiled_level_free(&map);
    }
    return 4;
}
"#;

fn compiler_available() -> bool {
    Command::new("cc").arg("--version").output().is_ok_and(|o| o.status.success())
}

fn compile(dir: &Path, args: &[&str]) {
    let output = Command::new("cc")
        .current_dir(dir)
        .args(["-std=c99", "-I."])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "cc {:?} failed:\n{}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn failed_allocation_unwinds_at_runtime() {
    if !compiler_available() {
        eprintln!("skipping: no C compiler on PATH");
        return;
    }

    let temp = tempfile::tempdir().unwrap();
    let map = write_level(temp.path());
    let files = generate(&[MapTarget::new("level", map)], &CodegenConfig::default()).unwrap();
    let out = temp.path().join("out");
    write_files(&files, &out, false).unwrap();
    fs::write(out.join("failing_calloc.c"), FAILING_CALLOC).unwrap();
    fs::write(out.join("unwind.c"), UNWIND_DRIVER).unwrap();

    compile(&out, &["-c", "failing_calloc.c", "-o", "failing_calloc.o"]);
    compile(
        &out,
        &[
            "-Dcalloc=failing_calloc",
            "maps/level.c",
            "unwind.c",
            "failing_calloc.o",
            "-o",
            "unwind",
        ],
    );

    let run = Command::new(out.join("unwind")).output().unwrap();
    assert!(run.status.success(), "unwind exited with {:?}", run.status);
    let failed_runs: u32 = String::from_utf8_lossy(&run.stdout).trim().parse().unwrap();
    // One failing run per calloc call made by a successful build of the level
    assert!(failed_runs >= 17, "only {failed_runs} allocations exercised");
}
