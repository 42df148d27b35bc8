//! Temperature encodings.
//!
//! Reports and commands carry the set point on different scales, and the
//! sensor bytes use two more. None of these share a formula.

use super::codec::CodecError;

pub type DegreesC = f32;

/// Lowest set point a state command accepts.
pub const SET_POINT_MIN: DegreesC = 10.0;
/// Highest set point a state command accepts.
pub const SET_POINT_MAX: DegreesC = 30.0;

const REPORT_SET_POINT_BASE: DegreesC = 16.0;
/// Largest value of the 4 bit whole-degree report field.
const REPORT_SET_POINT_WHOLE_MAX: u8 = 0x0f;
const COMMAND_SET_POINT_BASE: u8 = 111;

/// Set point from the report's 4 bit whole-degree field and half-degree bit.
pub fn report_set_point(whole: u8, half: bool) -> DegreesC {
    REPORT_SET_POINT_BASE + (whole & REPORT_SET_POINT_WHOLE_MAX) as DegreesC + half_degree(half)
}

/// Report fields for a set point, the inverse of [`report_set_point`].
pub fn report_set_point_fields(celsius: DegreesC) -> Result<(u8, bool), CodecError> {
    let max = report_set_point(REPORT_SET_POINT_WHOLE_MAX, true);
    if !(REPORT_SET_POINT_BASE..=max).contains(&celsius) {
        return Err(CodecError::TemperatureOutOfRange(celsius));
    }

    let doubled = ((celsius - REPORT_SET_POINT_BASE) * 2.0).floor() as u8;
    Ok((doubled / 2, doubled % 2 == 1))
}

/// Command fields (`whole + 111`, half-degree bit) for a set point in
/// `[10.0, 30.0]`. Anything outside the range, NaN included, is rejected.
pub fn command_set_point_fields(celsius: DegreesC) -> Result<(u8, bool), CodecError> {
    if !(SET_POINT_MIN..=SET_POINT_MAX).contains(&celsius) {
        return Err(CodecError::TemperatureOutOfRange(celsius));
    }

    let doubled = (celsius * 2.0).floor() as u8;
    let whole = doubled / 2;
    let half = doubled % 2 == 1;

    Ok((whole + COMMAND_SET_POINT_BASE, half))
}

/// Set point held in a command's fields.
pub fn command_set_point(whole: u8, half: bool) -> DegreesC {
    (whole as DegreesC - COMMAND_SET_POINT_BASE as DegreesC) + half_degree(half)
}

/// Indoor air and indoor heat exchanger sensors.
pub fn indoor_sensor(raw: u8) -> DegreesC {
    (raw as f64 * 0.3 - 11.5) as DegreesC
}

/// Outdoor air, condenser coil and compressor discharge sensors report
/// whole degrees directly.
pub fn outdoor_sensor(raw: u8) -> DegreesC {
    raw as DegreesC
}

fn half_degree(half: bool) -> DegreesC {
    if half { 0.5 } else { 0.0 }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_set_point() {
        assert_eq!(report_set_point(0, false), 16.0);
        assert_eq!(report_set_point(6, true), 22.5);
        assert_eq!(report_set_point(0x0f, true), 31.5);

        assert_eq!(report_set_point_fields(22.5).unwrap(), (6, true));
        assert_eq!(report_set_point_fields(16.0).unwrap(), (0, false));
        assert!(report_set_point_fields(15.5).is_err());
        assert!(report_set_point_fields(32.0).is_err());
    }

    #[test]
    fn test_command_set_point() {
        assert_eq!(command_set_point_fields(22.5).unwrap(), (133, true));
        assert_eq!(command_set_point_fields(21.0).unwrap(), (132, false));
        assert_eq!(command_set_point_fields(10.0).unwrap(), (121, false));
        assert_eq!(command_set_point_fields(30.0).unwrap(), (141, false));
        // quarter degrees round down to the half degree below
        assert_eq!(command_set_point_fields(21.7).unwrap(), (132, true));

        for celsius in [10.0, 10.5, 21.0, 22.5, 29.5, 30.0] {
            let (whole, half) = command_set_point_fields(celsius).unwrap();
            assert_eq!(command_set_point(whole, half), celsius);
        }
    }

    #[test]
    fn test_command_set_point_range() {
        for celsius in [9.5, 30.5, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                command_set_point_fields(celsius),
                Err(CodecError::TemperatureOutOfRange(_))
            ));
        }
    }

    #[test]
    fn test_sensors() {
        assert_eq!(indoor_sensor(100), 18.5);
        assert_eq!(indoor_sensor(0), -11.5);
        assert_eq!(outdoor_sensor(0), 0.0);
        assert_eq!(outdoor_sensor(0xff), 255.0);
    }
}
