//! Generation settings and the TOML project file

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::CodegenError;

const DEFAULT_LIBRARY_NAME: &str = "maps";

/// Configuration for code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenConfig {
    /// CMake library target; the smoke test is `<library_name>_test`
    pub library_name: String,

    /// CMake project name; the library name when unset
    pub project: Option<String>,
}

impl CodegenConfig {
    pub fn new(library_name: impl Into<String>) -> Self {
        Self {
            library_name: library_name.into(),
            project: None,
        }
    }

    /// Use a project name distinct from the library name
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn project_name(&self) -> &str {
        self.project.as_deref().unwrap_or(&self.library_name)
    }

    /// Reject names CMake cannot use as a target or project
    pub fn validate(&self) -> Result<(), CodegenError> {
        let names = [
            ("library name", self.library_name.as_str()),
            ("project", self.project_name()),
        ];
        for (what, name) in names {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'));
            if !valid {
                return Err(CodegenError::ConfigError(format!("invalid {what} `{name}`")));
            }
        }
        Ok(())
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LIBRARY_NAME)
    }
}

/// A map listed in a project file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapEntry {
    pub path: PathBuf,
    /// Identifier used in generated names; positional default when unset
    #[serde(default)]
    pub name: Option<String>,
}

/// Project file, deserialized from TOML
///
/// Every field is optional so command-line values can fill the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    #[serde(default)]
    pub library_name: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    #[serde(default)]
    pub delete_destination_directory: bool,
    #[serde(default)]
    pub maps: Vec<MapEntry>,
}

impl ProjectFile {
    /// Load a project file; relative paths resolve against its directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CodegenError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut project = Self::parse(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        project.resolve_paths(base);

        debug!(path = %path.display(), maps = project.maps.len(), "loaded project file");
        Ok(project)
    }

    pub fn parse(content: &str) -> Result<Self, CodegenError> {
        Ok(toml::from_str(content)?)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if let Some(out_dir) = &mut self.out_dir {
            if out_dir.is_relative() {
                *out_dir = base.join(&*out_dir);
            }
        }
        for map in &mut self.maps {
            if map.path.is_relative() {
                map.path = base.join(&map.path);
            }
        }
    }

    /// Generation settings described by this file
    pub fn codegen_config(&self) -> CodegenConfig {
        let mut config = match &self.library_name {
            Some(name) => CodegenConfig::new(name.clone()),
            None => CodegenConfig::default(),
        };
        config.project = self.project.clone();
        config
    }
}
