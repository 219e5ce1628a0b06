//! Built-in element and sequence catalogue for [`super::Bufr4Codec`].
//!
//! This is a fixed, pre-expanded key space: sequences list their member
//! elements directly and there is no recursive expansion or replication.

use crate::models::{ElementAttributes, NativeType};

pub const CCITT_IA5: &str = "CCITT IA5";

/// Table B entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub code: i64,
    pub name: &'static str,
    pub units: &'static str,
    pub scale: i32,
    pub reference: i64,
    pub width: u32,
}

impl ElementDescriptor {
    pub fn is_text(&self) -> bool {
        self.units == CCITT_IA5
    }

    pub fn native_type(&self) -> NativeType {
        if self.is_text() {
            NativeType::String
        } else if self.scale > 0 {
            NativeType::Float
        } else {
            NativeType::Int
        }
    }

    pub fn attributes(&self) -> ElementAttributes {
        ElementAttributes {
            code: self.code,
            units: self.units.to_string(),
            scale: self.scale,
            reference: self.reference,
            width: self.width,
        }
    }
}

const fn element(
    code: i64,
    name: &'static str,
    units: &'static str,
    scale: i32,
    reference: i64,
    width: u32,
) -> ElementDescriptor {
    ElementDescriptor {
        code,
        name,
        units,
        scale,
        reference,
        width,
    }
}

pub const ELEMENTS: &[ElementDescriptor] = &[
    element(1001, "blockNumber", "Numeric", 0, 0, 7),
    element(1002, "stationNumber", "Numeric", 0, 0, 10),
    element(1015, "stationOrSiteName", CCITT_IA5, 0, 0, 160),
    element(1125, "wigosIdentifierSeries", "Numeric", 0, 0, 4),
    element(1126, "wigosIssuerOfIdentifier", "Numeric", 0, 0, 16),
    element(1127, "wigosIssueNumber", "Numeric", 0, 0, 16),
    element(1128, "wigosLocalIdentifierCharacter", CCITT_IA5, 0, 0, 128),
    element(2001, "stationType", "CODE TABLE", 0, 0, 2),
    element(4001, "year", "a", 0, 0, 12),
    element(4002, "month", "mon", 0, 0, 4),
    element(4003, "day", "d", 0, 0, 6),
    element(4004, "hour", "h", 0, 0, 5),
    element(4005, "minute", "min", 0, 0, 6),
    element(4006, "second", "s", 0, 0, 6),
    element(5001, "latitude", "deg", 5, -9_000_000, 25),
    element(6001, "longitude", "deg", 5, -18_000_000, 26),
    element(7030, "heightOfStationGroundAboveMeanSeaLevel", "m", 1, -4000, 17),
    element(7031, "heightOfBarometerAboveMeanSeaLevel", "m", 1, -4000, 17),
    element(10004, "nonCoordinatePressure", "Pa", -1, 0, 14),
    element(10051, "pressureReducedToMeanSeaLevel", "Pa", -1, 0, 14),
    element(11001, "windDirection", "deg", 0, 0, 9),
    element(11002, "windSpeed", "m s-1", 1, 0, 12),
    element(12101, "airTemperature", "K", 2, 0, 16),
    element(12103, "dewpointTemperature", "K", 2, 0, 16),
    element(13003, "relativeHumidity", "%", 0, 0, 7),
    element(13011, "totalPrecipitationOrTotalWaterEquivalent", "kg m-2", 1, -1, 14),
    element(20010, "cloudCoverTotal", "%", 0, 0, 7),
];

/// Table D entries, already expanded to element codes
pub const SEQUENCES: &[(i64, &[i64])] = &[
    (301011, &[4001, 4002, 4003]),
    (301012, &[4004, 4005]),
    (301013, &[4004, 4005, 4006]),
    (301021, &[5001, 6001]),
    (301150, &[1125, 1126, 1127, 1128]),
];

pub fn find_element(code: i64) -> Option<&'static ElementDescriptor> {
    ELEMENTS.iter().find(|e| e.code == code)
}

pub fn find_sequence(code: i64) -> Option<&'static [i64]> {
    SEQUENCES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, members)| *members)
}

/// Split a descriptor code into its F, X and Y parts
pub fn fxy(code: i64) -> (i64, i64, i64) {
    (code / 100_000, (code / 1000) % 100, code % 1000)
}
