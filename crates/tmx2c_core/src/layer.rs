//! Tile layers and their packed tile data

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use roxmltree::Node;
use serde::Serialize;
use tracing::debug;

use crate::property::{read_optional_properties, Properties};
use crate::xml::{first_text, required_child, required_int, required_str};
use crate::ModelError;

const SUPPORTED_ENCODING: &str = "base64";

/// A fixed-size grid of global tile ids
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub id: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major global tile ids; `width * height` entries
    pub data: Vec<u32>,
    pub properties: Properties,
}

impl Layer {
    /// Build a layer from a `<layer>` element
    pub fn read(element: Node<'_, '_>) -> Result<Self, ModelError> {
        let name = required_str(element, "name")?.to_string();
        let id = required_int(element, "id")?;
        let width: u32 = required_int(element, "width")?;
        let height: u32 = required_int(element, "height")?;

        let data_element = required_child(element, "data")?;
        let encoding = data_element.attribute("encoding").unwrap_or("xml");
        if encoding != SUPPORTED_ENCODING {
            return Err(ModelError::UnsupportedEncoding(encoding.to_string()));
        }
        if let Some(compression) = data_element.attribute("compression") {
            return Err(ModelError::UnsupportedEncoding(format!(
                "{SUPPORTED_ENCODING} with {compression} compression"
            )));
        }

        let payload = first_text(data_element).ok_or_else(|| ModelError::InvalidTileData {
            layer: name.clone(),
            reason: "no text content".to_string(),
        })?;

        let data = decode_tile_data(payload).map_err(|reason| ModelError::InvalidTileData {
            layer: name.clone(),
            reason,
        })?;

        let expected = u64::from(width) * u64::from(height);
        if data.len() as u64 != expected {
            return Err(ModelError::InvalidTileData {
                layer: name,
                reason: format!(
                    "expected {expected} tiles ({width}x{height}), found {}",
                    data.len()
                ),
            });
        }

        debug!(layer = %name, width, height, "read layer");

        Ok(Self {
            id,
            name,
            width,
            height,
            data,
            properties: read_optional_properties(element)?,
        })
    }
}

/// Decode base64 text into little-endian `u32` tile ids
///
/// Whitespace around and inside the payload is ignored.
pub fn decode_tile_data(payload: &str) -> Result<Vec<u32>, String> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64: {e}"))?;

    if bytes.len() % 4 != 0 {
        return Err(format!(
            "{} bytes is not a whole number of 32-bit tile ids",
            bytes.len()
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
