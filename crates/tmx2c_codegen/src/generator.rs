//! Main code generation orchestration
//!
//! Collects object kinds from every map, drafts each output file, resolves
//! the includes between them and finally writes the set to disk.

use indexmap::IndexSet;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tmx2c_core::Map;
use tracing::{debug, info, warn};

use crate::cmake::generate_build_descriptor;
use crate::config::CodegenConfig;
use crate::files::{FileManager, GeneratedFile};
use crate::header::generate_map_types;
use crate::map_file::{generate_map_files, generate_test_program};
use crate::object_types::ObjectTypes;
use crate::objects::generate_object_types;
use crate::{is_c_identifier, CodegenError};

/// A loaded map and the identifier used in its generated names
#[derive(Debug, Clone, PartialEq)]
pub struct MapTarget {
    pub name: String,
    pub map: Map,
}

impl MapTarget {
    pub fn new(name: impl Into<String>, map: Map) -> Self {
        Self {
            name: name.into(),
            map,
        }
    }
}

/// Result of writing generated files
#[derive(Debug, Clone)]
pub struct CodegenResult {
    /// Files that were written
    pub generated_files: Vec<PathBuf>,

    /// Any warnings that occurred
    pub warnings: Vec<String>,
}

impl CodegenResult {
    fn new() -> Self {
        Self {
            generated_files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn add_file(&mut self, path: PathBuf) {
        self.generated_files.push(path);
    }

    fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Generate the complete file set for `targets`
///
/// Nothing is returned unless every file was drafted and resolved. The
/// order is:
/// - `tiled.h`
/// - `maps/<name>.h` and `maps/<name>.c` per map
/// - `test.c`
/// - `object.h`
/// - `CMakeLists.txt`, drafted from the resolved file list
pub fn generate(
    targets: &[MapTarget],
    config: &CodegenConfig,
) -> Result<Vec<GeneratedFile>, CodegenError> {
    config.validate()?;
    validate_targets(targets)?;

    let object_types = ObjectTypes::collect(targets.iter().map(|t| &t.map))?;
    let mut fm = FileManager::new();

    generate_map_types(&mut fm);
    for target in targets {
        debug!(map = %target.name, "generating map");
        generate_map_files(&mut fm, target, &object_types)?;
    }
    generate_test_program(&mut fm, targets);
    generate_object_types(&mut fm, &object_types);

    let mut files = fm.finalize()?;

    generate_build_descriptor(&mut fm, &files, config);
    files.extend(fm.finalize()?);

    info!(
        maps = targets.len(),
        object_types = object_types.len(),
        files = files.len(),
        "generated map library"
    );
    Ok(files)
}

fn validate_targets(targets: &[MapTarget]) -> Result<(), CodegenError> {
    if targets.is_empty() {
        return Err(CodegenError::ConfigError("no maps to generate".to_string()));
    }

    let mut seen = HashSet::new();
    for target in targets {
        if !is_c_identifier(&target.name) {
            return Err(CodegenError::InvalidMapName(target.name.clone()));
        }
        if !seen.insert(target.name.as_str()) {
            return Err(CodegenError::DuplicateMapName(target.name.clone()));
        }
    }
    Ok(())
}

/// Write generated files below `out_dir`
///
/// With `clean`, every directory that receives a file is removed first.
/// Otherwise files already present there but not part of this generation
/// are left alone and reported as warnings.
pub fn write_files(
    files: &[GeneratedFile],
    out_dir: &Path,
    clean: bool,
) -> Result<CodegenResult, CodegenError> {
    let mut result = CodegenResult::new();

    let destinations: Vec<PathBuf> = files.iter().map(|f| destination(out_dir, &f.path)).collect();
    let directories: IndexSet<PathBuf> = destinations
        .iter()
        .filter_map(|path| path.parent().map(Path::to_path_buf))
        .collect();

    if clean {
        for directory in &directories {
            match fs::remove_dir_all(directory) {
                Ok(()) => debug!(dir = %directory.display(), "removed destination directory"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    } else {
        let written: HashSet<&Path> = destinations.iter().map(PathBuf::as_path).collect();
        for directory in &directories {
            for stale in stale_files(directory, &written)? {
                warn!(file = %stale.display(), "leftover file in output directory");
                result.add_warning(format!("leftover file {}", stale.display()));
            }
        }
    }

    for (file, path) in files.iter().zip(destinations) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.contents)?;
        result.add_file(path);
    }

    info!(
        dir = %out_dir.display(),
        files = result.generated_files.len(),
        "wrote generated files"
    );
    Ok(result)
}

fn destination(out_dir: &Path, relative: &str) -> PathBuf {
    relative.split('/').fold(out_dir.to_path_buf(), |path, part| path.join(part))
}

fn stale_files(directory: &Path, written: &HashSet<&Path>) -> Result<Vec<PathBuf>, CodegenError> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut stale = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let generated_kind = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("c") | Some("h")
        );
        if generated_kind && entry.file_type()?.is_file() && !written.contains(path.as_path()) {
            stale.push(path);
        }
    }
    stale.sort();
    Ok(stale)
}
