#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use lane_defence_core::CellCoord;
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "lane";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const SNAPSHOT_HEADER: &str = "lane:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of a grid's shape and the obstacles placed on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct LayoutSnapshot {
    /// Number of cell columns in the grid.
    pub columns: u32,
    /// Number of cell rows in the grid.
    pub rows: u32,
    /// Pixels per cell edge.
    pub scale: u32,
    /// Rows in the spawn band.
    pub spawn_rows: u32,
    /// Rows in the building band.
    pub building_rows: u32,
    /// Rows in the death band.
    pub death_rows: u32,
    /// Obstacles composing the layout captured by the snapshot.
    pub obstacles: Vec<LayoutObstacle>,
}

impl LayoutSnapshot {
    /// Encodes the snapshot into a single-line string suitable for sharing.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let payload = SerializablePayload {
            scale: self.scale,
            spawn_rows: self.spawn_rows,
            building_rows: self.building_rows,
            death_rows: self.death_rows,
            obstacles: self.obstacles.clone(),
        };
        let json = serde_json::to_vec(&payload).expect("layout snapshot serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!("{SNAPSHOT_HEADER}:{}x{}:{encoded}", self.columns, self.rows)
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutError::MissingVersion)?;
        let dimensions = parts.next().ok_or(LayoutError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LayoutError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LayoutError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutError::InvalidEncoding)?;
        let decoded: SerializablePayload =
            serde_json::from_slice(&bytes).map_err(LayoutError::InvalidPayload)?;

        Ok(Self {
            columns,
            rows,
            scale: decoded.scale,
            spawn_rows: decoded.spawn_rows,
            building_rows: decoded.building_rows,
            death_rows: decoded.death_rows,
            obstacles: decoded.obstacles,
        })
    }
}

/// Obstacle description captured within a layout snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct LayoutObstacle {
    /// Upper-left cell anchoring the obstacle's footprint.
    pub origin: CellCoord,
    /// Width of the footprint in cells.
    pub columns: u32,
    /// Height of the footprint in cells.
    pub rows: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializablePayload {
    scale: u32,
    spawn_rows: u32,
    building_rows: u32,
    death_rows: u32,
    obstacles: Vec<LayoutObstacle>,
}

/// Errors that can occur while decoding layout strings.
#[derive(Debug)]
pub(crate) enum LayoutError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded layout.
    MissingPrefix,
    /// The encoded layout did not contain a version segment.
    MissingVersion,
    /// The encoded layout did not include grid dimensions.
    MissingDimensions,
    /// The encoded layout did not include the payload segment.
    MissingPayload,
    /// The encoded layout used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded layout used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded layout.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "layout string was empty"),
            Self::MissingPrefix => write!(f, "layout string is missing the prefix"),
            Self::MissingVersion => write!(f, "layout string is missing the version"),
            Self::MissingDimensions => write!(f, "layout string is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "layout string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "layout prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "layout version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode layout payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse layout payload: {error}")
            }
        }
    }
}

impl Error for LayoutError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| LayoutError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || rows == 0 {
        return Err(LayoutError::InvalidDimensions(dimensions.to_owned()));
    }

    Ok((columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> LayoutSnapshot {
        LayoutSnapshot {
            columns: 12,
            rows: 10,
            scale: 16,
            spawn_rows: 2,
            building_rows: 6,
            death_rows: 2,
            obstacles: Vec::new(),
        }
    }

    #[test]
    fn round_trip_empty_layout() {
        let snapshot = sample_snapshot();

        let encoded = snapshot.encode();
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:12x10:")));

        let decoded = LayoutSnapshot::decode(&encoded).expect("snapshot decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn round_trip_populated_layout() {
        let mut snapshot = sample_snapshot();
        snapshot.obstacles = vec![
            LayoutObstacle {
                origin: CellCoord::new(5, 3),
                columns: 2,
                rows: 2,
            },
            LayoutObstacle {
                origin: CellCoord::new(0, 7),
                columns: 1,
                rows: 1,
            },
        ];

        let encoded = snapshot.encode();
        let decoded = LayoutSnapshot::decode(&encoded).expect("snapshot decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn decode_rejects_foreign_prefixes() {
        let encoded = sample_snapshot().encode();
        let tampered = encoded.replacen("lane", "maze", 1);
        assert!(matches!(
            LayoutSnapshot::decode(&tampered),
            Err(LayoutError::InvalidPrefix(prefix)) if prefix == "maze",
        ));
    }

    #[test]
    fn decode_rejects_unknown_versions() {
        let encoded = sample_snapshot().encode();
        let tampered = encoded.replacen("v1", "v9", 1);
        assert!(matches!(
            LayoutSnapshot::decode(&tampered),
            Err(LayoutError::UnsupportedVersion(version)) if version == "v9",
        ));
    }

    #[test]
    fn decode_rejects_unparseable_dimensions() {
        assert!(matches!(
            LayoutSnapshot::decode("lane:v1:axb:e30"),
            Err(LayoutError::InvalidDimensions(_)),
        ));
        assert!(matches!(
            LayoutSnapshot::decode("lane:v1:0x4:e30"),
            Err(LayoutError::InvalidDimensions(_)),
        ));
    }

    #[test]
    fn decode_rejects_blank_input() {
        assert!(matches!(
            LayoutSnapshot::decode("   "),
            Err(LayoutError::EmptyPayload),
        ));
    }

    #[test]
    fn decode_rejects_mangled_payloads() {
        assert!(matches!(
            LayoutSnapshot::decode("lane:v1:3x3:!!!"),
            Err(LayoutError::InvalidEncoding(_)),
        ));

        let not_json = STANDARD_NO_PAD.encode(b"not a payload");
        let mangled = format!("lane:v1:3x3:{not_json}");
        assert!(matches!(
            LayoutSnapshot::decode(&mangled),
            Err(LayoutError::InvalidPayload(_)),
        ));
    }
}
