//! Google encoded polyline (precision 1e5) into validated coordinates.

use crate::geo::Coordinate;

use super::RouteError;

const PRECISION: u32 = 5;

/// Valid encoded characters are `?` (63) through `~` (126); those below `_` (95)
/// end a value.
fn ends_value(byte: u8) -> bool {
    (63..95).contains(&byte)
}

/// Every value must be terminated and values come in lat/lng pairs.
fn check_structure(encoded: &str) -> Result<(), RouteError> {
    let mut values = 0usize;
    for byte in encoded.bytes() {
        if !(63..=126).contains(&byte) {
            return Err(RouteError::Decode(format!("invalid polyline byte {byte:#x}")));
        }
        if ends_value(byte) {
            values += 1;
        }
    }
    let terminated = encoded.bytes().last().map_or(true, ends_value);
    if !terminated || values % 2 != 0 {
        return Err(RouteError::Decode("truncated polyline".to_string()));
    }
    Ok(())
}

/// Decode an encoded polyline into coordinates.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, RouteError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    check_structure(encoded)?;

    let line = ::polyline::decode_polyline(encoded, PRECISION)
        .map_err(|err| RouteError::Decode(err.to_string()))?;
    line.into_iter()
        .map(|coord| {
            Coordinate::new(coord.y, coord.x)
                .map_err(|err| RouteError::Decode(format!("polyline vertex out of range: {err}")))
        })
        .collect()
}
