//! tmx2c - turn Tiled maps into a C library
//!
//! Settings come from an optional project file and the command line, the
//! latter taking precedence. Maps from the project file come first, followed
//! by maps named on the command line.

pub mod cli;
pub mod logging;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tmx2c_codegen::{generate, write_files, CodegenConfig, MapEntry, MapTarget, ProjectFile};
use tmx2c_core::{load_map, Map};
use tracing::info;

use crate::cli::Cli;

const DEFAULT_OUT_DIR: &str = "generated";

/// Settings for one run, merged from the project file and the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub maps: Vec<MapEntry>,
    pub out_dir: PathBuf,
    pub config: CodegenConfig,
    pub delete_destination_directory: bool,
    pub print_model: bool,
}

impl Options {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let project = match &cli.config {
            Some(path) => ProjectFile::load(path)
                .with_context(|| format!("Loading project file {}", path.display()))?,
            None => ProjectFile::default(),
        };

        let mut config = project.codegen_config();
        if let Some(library_name) = &cli.library_name {
            config.library_name = library_name.clone();
        }
        if let Some(project_name) = &cli.project {
            config.project = Some(project_name.clone());
        }

        let mut maps = project.maps;
        maps.extend(cli.maps.iter().map(|arg| MapEntry {
            path: arg.path.clone(),
            name: arg.name.clone(),
        }));
        if maps.is_empty() {
            bail!("No maps given; pass map files or list them in a project file");
        }

        let out_dir = cli
            .out_dir
            .clone()
            .or(project.out_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));

        Ok(Self {
            maps,
            out_dir,
            config,
            delete_destination_directory: cli.delete_destination_directory
                || project.delete_destination_directory,
            print_model: cli.print_model,
        })
    }
}

/// Load every map; unnamed maps are called `map_<position>`
pub fn load_targets(maps: &[MapEntry]) -> Result<Vec<MapTarget>> {
    maps.iter()
        .enumerate()
        .map(|(i, entry)| {
            let name = entry.name.clone().unwrap_or_else(|| format!("map_{i}"));
            let map = load_map(&entry.path)
                .with_context(|| format!("Loading map {}", entry.path.display()))?;
            Ok(MapTarget::new(name, map))
        })
        .collect()
}

#[derive(Serialize)]
struct NamedMap<'a> {
    name: &'a str,
    map: &'a Map,
}

/// Render loaded maps as pretty JSON
pub fn model_json(targets: &[MapTarget]) -> Result<String> {
    let named: Vec<NamedMap<'_>> = targets
        .iter()
        .map(|t| NamedMap {
            name: &t.name,
            map: &t.map,
        })
        .collect();
    serde_json::to_string_pretty(&named).context("Serializing map model")
}

pub fn run(cli: &Cli) -> Result<()> {
    let options = Options::resolve(cli)?;
    let targets = load_targets(&options.maps)?;

    if options.print_model {
        println!("{}", model_json(&targets)?);
        return Ok(());
    }

    let files = generate(&targets, &options.config).context("Generating C sources")?;
    let result = write_files(
        &files,
        &options.out_dir,
        options.delete_destination_directory,
    )
    .with_context(|| format!("Writing {}", options.out_dir.display()))?;

    info!(
        maps = targets.len(),
        files = result.generated_files.len(),
        warnings = result.warnings.len(),
        out_dir = %options.out_dir.display(),
        "done"
    );
    Ok(())
}
