//! Build descriptor (`CMakeLists.txt`)

use crate::config::CodegenConfig;
use crate::files::{FileManager, GeneratedFile};
use crate::paths::{BUILD_DESCRIPTOR, TEST_SOURCE};
use crate::stream::Writer;

const COMPILE_OPTIONS: &str = "-pedantic -Wextra -Werror -Wall";

/// Emit and commit a CMake project over the resolved `files`
///
/// Every `.c` file except the smoke test goes into the shared library.
pub fn generate_build_descriptor(
    fm: &mut FileManager,
    files: &[GeneratedFile],
    config: &CodegenConfig,
) {
    let library = config.library_name.as_str();
    let sources: Vec<&str> = files
        .iter()
        .map(|f| f.path.as_str())
        .filter(|path| path.ends_with(".c") && *path != TEST_SOURCE)
        .collect();

    fm.write("cmake_minimum_required(VERSION 3.10)\n");
    fm.write(&format!("project({} C)\n\n", config.project_name()));
    fm.write("set(CMAKE_C_STANDARD 99)\n");
    fm.write("set(CMAKE_C_STANDARD_REQUIRED ON)\n\n");

    fm.block(
        "add_library(\n",
        |fm| {
            fm.write(&format!("{library} SHARED\n"));
            for source in &sources {
                fm.write(&format!("{source}\n"));
            }
        },
        ")\n",
    );
    fm.write(&format!(
        "target_include_directories({library} PUBLIC ${{CMAKE_CURRENT_SOURCE_DIR}})\n"
    ));
    fm.write(&format!(
        "target_compile_options({library} PRIVATE {COMPILE_OPTIONS})\n\n"
    ));

    fm.write(&format!("add_executable({library}_test {TEST_SOURCE})\n"));
    fm.write(&format!("target_link_libraries({library}_test {library})\n"));

    fm.commit(BUILD_DESCRIPTOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> GeneratedFile {
        GeneratedFile {
            path: path.to_string(),
            contents: String::new(),
        }
    }

    #[test]
    fn test_library_takes_map_sources_only() {
        let files = [
            file("tiled.h"),
            file("maps/first.h"),
            file("maps/first.c"),
            file("maps/second.c"),
            file("test.c"),
            file("object.h"),
        ];
        let mut fm = FileManager::new();
        generate_build_descriptor(
            &mut fm,
            &files,
            &CodegenConfig::new("levels").with_project("game"),
        );

        let descriptor = fm.finalize().unwrap().remove(0);
        assert_eq!(descriptor.path, "CMakeLists.txt");
        assert_eq!(
            descriptor.contents,
            "cmake_minimum_required(VERSION 3.10)\n\
             project(game C)\n\n\
             set(CMAKE_C_STANDARD 99)\n\
             set(CMAKE_C_STANDARD_REQUIRED ON)\n\n\
             add_library(\n    levels SHARED\n    maps/first.c\n    maps/second.c\n)\n\
             target_include_directories(levels PUBLIC ${CMAKE_CURRENT_SOURCE_DIR})\n\
             target_compile_options(levels PRIVATE -pedantic -Wextra -Werror -Wall)\n\n\
             add_executable(levels_test test.c)\n\
             target_link_libraries(levels_test levels)\n"
        );
    }
}
