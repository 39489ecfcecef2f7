//! # Satellite Positions
//!
//! Read-only lookup of orbital positions by rotor slot.
//!
//! Orbital positions use the packed-decimal encoding of the DVB satellite
//! delivery system descriptor: four BCD digits in tenths of a degree, so
//! 19.2° is stored as `0x0192`. An east/west flag gives the direction.

use serde::Deserialize;
use tracing::warn;

/// East/west flag of an orbital position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    East,
    West,
}

/// One satellite entry as consumed by the rotor controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatellitePosition {
    /// Short display name, e.g. `S19E2`
    pub name: String,
    /// Packed-decimal orbital position, tenths of a degree
    pub orbital_position: u16,
    pub direction: Direction,
    /// Slot number stored in the positioner
    pub rotor_position: u8,
}

impl SatellitePosition {
    pub fn new(name: impl Into<String>, orbital_position: u16, direction: Direction, rotor_position: u8) -> Self {
        Self {
            name: name.into(),
            orbital_position,
            direction,
            rotor_position,
        }
    }

    /// Dish angle in degrees, 0.0 (inclusive) to 360.0 (exclusive)
    ///
    /// East positions map directly, west positions map to `360 - position`.
    pub fn angle(&self) -> f64 {
        let degrees = decode_orbital_position(self.orbital_position);
        let angle = match self.direction {
            Direction::East => degrees,
            Direction::West => 360.0 - degrees,
        };
        angle.rem_euclid(360.0)
    }
}

/// Decode a packed-decimal orbital position into degrees
///
/// Each nibble is taken as a decimal digit without validation.
pub fn decode_orbital_position(bcd: u16) -> f64 {
    let thousands = ((bcd >> 12) & 0x0F) as u32;
    let hundreds = ((bcd >> 8) & 0x0F) as u32;
    let tens = ((bcd >> 4) & 0x0F) as u32;
    let ones = (bcd & 0x0F) as u32;

    (thousands * 1000 + hundreds * 100 + tens * 10 + ones) as f64 / 10.0
}

/// Encode tenths of a degree (0-9999) into packed decimal
pub fn encode_orbital_position(tenths: u16) -> u16 {
    let tenths = tenths.min(9999);
    ((tenths / 1000) << 12) | (((tenths / 100) % 10) << 8) | (((tenths / 10) % 10) << 4) | (tenths % 10)
}

/// Lookup of satellites by rotor position
#[cfg_attr(test, mockall::automock)]
pub trait SatelliteCatalog {
    /// Satellite stored at `rotor_position`, `None` if no satellite uses it
    fn lookup_satellite(&self, rotor_position: i32) -> Option<SatellitePosition>;
}

/// In-memory satellite table
#[derive(Debug, Clone, Default)]
pub struct SatelliteTable {
    entries: Vec<SatellitePosition>,
}

impl SatelliteTable {
    /// Build a table; later entries reusing a rotor position are dropped
    pub fn new(entries: Vec<SatellitePosition>) -> Self {
        let mut table = Self { entries: Vec::with_capacity(entries.len()) };

        for entry in entries {
            if table.lookup_satellite(entry.rotor_position as i32).is_some() {
                warn!(
                    "Rotor position {} already assigned, ignoring {}",
                    entry.rotor_position, entry.name
                );
                continue;
            }
            table.entries.push(entry);
        }

        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a satellite by short name, case-insensitive
    pub fn by_name(&self, name: &str) -> Option<&SatellitePosition> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SatellitePosition> {
        self.entries.iter()
    }
}

impl SatelliteCatalog for SatelliteTable {
    fn lookup_satellite(&self, rotor_position: i32) -> Option<SatellitePosition> {
        if rotor_position < 0 {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.rotor_position as i32 == rotor_position)
            .cloned()
    }
}
