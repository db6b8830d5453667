//! Records keyed by discrete global grid cells, and their boundaries.

use std::str::FromStr;

use h3o::CellIndex;
use serde_json::{Map, Value};
use tracing::warn;

use super::features::Position;
use crate::error::{GridvizError, Result};

/// Grid system a cell token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellGrid {
    /// Hexagonal H3 index written as a hex string.
    H3,
    /// S2 cell token.
    S2,
}

impl CellGrid {
    /// Boundary vertices of the cell, counter-clockwise, not closed.
    ///
    /// Returns `None` for tokens that do not decode.
    pub fn boundary(self, token: &str) -> Option<Vec<Position>> {
        match self {
            Self::H3 => {
                let cell = CellIndex::from_str(token).ok()?;
                Some(cell.boundary().iter().map(|ll| (ll.lng(), ll.lat())).collect())
            }
            Self::S2 => {
                if token.is_empty()
                    || token.len() > 16
                    || !token.chars().all(|c| c.is_ascii_hexdigit())
                {
                    return None;
                }
                let id = s2::cellid::CellID::from_token(token);
                if !id.is_valid() {
                    return None;
                }
                let cell = s2::cell::Cell::from(&id);
                Some(
                    (0..4)
                        .map(|k| {
                            let ll = s2::latlng::LatLng::from(&cell.vertex(k));
                            (ll.lng.deg(), ll.lat.deg())
                        })
                        .collect(),
                )
            }
        }
    }
}

/// A record keyed by a cell token, with the cell outline decoded at load.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub token: String,
    pub voltage: Option<f64>,
    /// `None` when the token does not decode.
    pub boundary: Option<Vec<Position>>,
}

/// Parses a JSON array of objects, reading the cell token from `token_field`.
///
/// Records without the token field are skipped.
///
/// # Errors
///
/// Returns [`GridvizError::Json`] if the text is not a JSON array.
pub fn parse_cells(
    text: &str,
    token_field: &str,
    grid: CellGrid,
    source_name: &str,
) -> Result<Vec<CellRecord>> {
    let records: Vec<Map<String, Value>> =
        serde_json::from_str(text).map_err(|source| GridvizError::Json {
            source_name: source_name.to_string(),
            source,
        })?;
    let cells: Vec<CellRecord> = records
        .into_iter()
        .filter_map(|r| {
            let token = r.get(token_field)?.as_str()?.to_string();
            let voltage = r.get("voltage").and_then(Value::as_f64);
            let boundary = grid.boundary(&token);
            Some(CellRecord {
                token,
                voltage,
                boundary,
            })
        })
        .collect();
    let undecoded = cells.iter().filter(|c| c.boundary.is_none()).count();
    if undecoded > 0 {
        warn!(source = source_name, undecoded, "cell tokens that do not decode are not drawn");
    }
    Ok(cells)
}
