//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

/// A map given on the command line: `path.tmx` or `path.tmx:name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapArg {
    pub path: PathBuf,
    pub name: Option<String>,
}

impl FromStr for MapArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Err("empty map argument".to_string());
        }

        // A suffix containing a separator belongs to the path (`C:\maps\a.tmx`)
        if let Some((path, name)) = value.rsplit_once(':') {
            if !path.is_empty() && !name.contains(['/', '\\']) {
                if name.is_empty() {
                    return Err(format!("missing map name after `:` in `{value}`"));
                }
                return Ok(Self {
                    path: PathBuf::from(path),
                    name: Some(name.to_string()),
                });
            }
        }

        Ok(Self {
            path: PathBuf::from(value),
            name: None,
        })
    }
}

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "tmx2c", version)]
#[command(about = "Generate a C library that builds Tiled maps in memory")]
pub struct Cli {
    /// Maps to convert, as `path.tmx` or `path.tmx:name`; unnamed maps become `map_<n>`
    pub maps: Vec<MapArg>,

    /// Output directory
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Name of the generated library target
    #[arg(long)]
    pub library_name: Option<String>,

    /// Name of the generated CMake project
    #[arg(long)]
    pub project: Option<String>,

    /// Remove directories receiving generated files before writing
    #[arg(long)]
    pub delete_destination_directory: bool,

    /// Project file listing maps and settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the parsed maps as JSON instead of generating code
    #[arg(long)]
    pub print_model: bool,

    /// More logging; repeat for trace output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
