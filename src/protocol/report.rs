use packed_struct::prelude::*;

use super::codec::CodecError;
use super::header::{Header, REPORT_SIZE};
use super::settings::{FanSpeed, IndoorFanSpeed, LeftRightFlow, Mode, OutdoorStatus, Setting, SleepMode, UpDownFlow};
use super::temperature::{self, DegreesC};

/// State report, sent by the unit in answer to a query.
///
/// Every bit pattern unpacks; unexplained regions are kept as they arrived.
/// Enumerated settings hold report-side codes and are decoded on access.
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(bit_numbering="msb0", size_bytes="61")]
pub struct StateReport {
    #[packed_field(bytes="0:4")]
    pub header: Header,

    #[packed_field(bytes="5:6")]
    pub unknown_bytes05: [u8; 2],

    // byte 7

    #[packed_field(bits="56")]
    pub strong: bool,

    #[packed_field(bits="57")]
    pub eco: bool,

    #[packed_field(bits="58")]
    pub display: bool,

    #[packed_field(bits="59")]
    pub power: bool,

    #[packed_field(bits="60")]
    pub unknown_bit60: bool,

    #[packed_field(bits="61:63")]
    pub mode_code: u8,

    // byte 8

    #[packed_field(bits="64")]
    pub unknown_bit64: bool,

    #[packed_field(bits="65:67")]
    pub fan_speed_code: u8,

    /// Whole degrees of the set point, above 16.
    #[packed_field(bits="68:71")]
    pub set_point_whole: u8,

    // byte 9

    #[packed_field(bits="72:76")]
    pub unknown_bits72: u8,

    #[packed_field(bits="77")]
    pub health: bool,

    #[packed_field(bits="78")]
    pub unknown_bit78: bool,

    #[packed_field(bits="79")]
    pub set_point_half: bool,

    // byte 10

    #[packed_field(bits="80")]
    pub unknown_bit80: bool,

    #[packed_field(bits="81")]
    pub vertical_flow: bool,

    #[packed_field(bits="82")]
    pub horizontal_flow: bool,

    #[packed_field(bits="83:87")]
    pub unknown_bits83: u8,

    #[packed_field(bytes="11:16")]
    pub unknown_bytes0b: [u8; 6],

    #[packed_field(bytes="17")]
    pub indoor_temperature_raw: u8,

    #[packed_field(bytes="18")]
    pub unknown_byte12: u8,

    // byte 19

    #[packed_field(bits="152")]
    pub four_way_valve_on: bool,

    #[packed_field(bits="153:157")]
    pub unknown_bits153: u8,

    #[packed_field(bits="158:159")]
    pub sleep_code: u8,

    #[packed_field(bytes="20:29")]
    pub unknown_bytes14: [u8; 10],

    #[packed_field(bytes="30")]
    pub indoor_heat_exchanger_temperature_raw: u8,

    #[packed_field(bytes="31")]
    pub unknown_byte1f: u8,

    // byte 32

    #[packed_field(bits="256")]
    pub antifreeze: bool,

    #[packed_field(bits="257:263")]
    pub unknown_bits257: u8,

    // byte 33

    #[packed_field(bits="264")]
    pub mute: bool,

    #[packed_field(bits="265:271")]
    pub unknown_bits265: u8,

    #[packed_field(bytes="34")]
    pub indoor_fan_speed_code: u8,

    #[packed_field(bytes="35")]
    pub outdoor_temperature_raw: u8,

    #[packed_field(bytes="36")]
    pub condenser_coil_temperature_raw: u8,

    #[packed_field(bytes="37")]
    pub compressor_discharge_temperature_raw: u8,

    #[packed_field(bytes="38")]
    pub compressor_frequency: u8,

    #[packed_field(bytes="39")]
    pub outdoor_fan_speed: u8,

    // byte 40

    #[packed_field(bits="320")]
    pub unknown_bit320: bool,

    #[packed_field(bits="321")]
    pub heat_mode: bool,

    #[packed_field(bits="322:323")]
    pub unknown_bits322: u8,

    #[packed_field(bits="324:327")]
    pub outdoor_running_code: u8,

    #[packed_field(bytes="41:44")]
    pub unknown_bytes29: [u8; 4],

    #[packed_field(bytes="45")]
    pub supply_voltage: u8,

    #[packed_field(bytes="46")]
    pub current_used_amps: u8,

    #[packed_field(bytes="47:50")]
    pub unknown_bytes2f: [u8; 4],

    #[packed_field(bytes="51")]
    pub up_down_flow_code: u8,

    #[packed_field(bytes="52")]
    pub left_right_flow_code: u8,

    #[packed_field(bytes="53:60")]
    pub unknown_bytes35: [u8; 8],
}

impl StateReport {
    /// Decodes the first 61 bytes. Only a short buffer is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let bytes: &[u8; REPORT_SIZE] = bytes.get(..REPORT_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(CodecError::FrameTooShort { expected: REPORT_SIZE, actual: bytes.len() })?;

        Ok(Self::unpack(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<[u8; REPORT_SIZE], CodecError> {
        Ok(self.pack()?)
    }

    pub fn set_point(&self) -> DegreesC {
        temperature::report_set_point(self.set_point_whole, self.set_point_half)
    }

    pub fn mode(&self) -> Result<Mode, CodecError> {
        Mode::CODES.from_report(self.mode_code)
    }

    pub fn fan_speed(&self) -> Result<FanSpeed, CodecError> {
        FanSpeed::CODES.from_report(self.fan_speed_code)
    }

    pub fn sleep_mode(&self) -> Result<SleepMode, CodecError> {
        SleepMode::CODES.from_report(self.sleep_code)
    }

    pub fn up_down_flow(&self) -> Result<UpDownFlow, CodecError> {
        UpDownFlow::CODES.from_report(self.up_down_flow_code)
    }

    pub fn left_right_flow(&self) -> Result<LeftRightFlow, CodecError> {
        LeftRightFlow::CODES.from_report(self.left_right_flow_code)
    }

    pub fn indoor_fan_speed(&self) -> Result<IndoorFanSpeed, CodecError> {
        IndoorFanSpeed::from_primitive(self.indoor_fan_speed_code)
            .ok_or(CodecError::UnknownCode { setting: "indoor fan speed", code: self.indoor_fan_speed_code })
    }

    pub fn outdoor_running(&self) -> Result<OutdoorStatus, CodecError> {
        OutdoorStatus::from_primitive(self.outdoor_running_code)
            .ok_or(CodecError::UnknownCode { setting: "outdoor status", code: self.outdoor_running_code })
    }

    pub fn indoor_temperature(&self) -> DegreesC {
        temperature::indoor_sensor(self.indoor_temperature_raw)
    }

    pub fn indoor_heat_exchanger_temperature(&self) -> DegreesC {
        temperature::indoor_sensor(self.indoor_heat_exchanger_temperature_raw)
    }

    pub fn outdoor_temperature(&self) -> DegreesC {
        temperature::outdoor_sensor(self.outdoor_temperature_raw)
    }

    pub fn condenser_coil_temperature(&self) -> DegreesC {
        temperature::outdoor_sensor(self.condenser_coil_temperature_raw)
    }

    pub fn compressor_discharge_temperature(&self) -> DegreesC {
        temperature::outdoor_sensor(self.compressor_discharge_temperature_raw)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(offset: usize, value: u8) -> StateReport {
        let mut bytes = [0x00; REPORT_SIZE];
        bytes[offset] = value;
        StateReport::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_flag_bit_positions() {
        let cases: [(usize, u8, fn(&StateReport) -> bool); 12] = [
            (0x07, 0x80, |r| r.strong),
            (0x07, 0x40, |r| r.eco),
            (0x07, 0x20, |r| r.display),
            (0x07, 0x10, |r| r.power),
            (0x09, 0x04, |r| r.health),
            (0x09, 0x01, |r| r.set_point_half),
            (0x0a, 0x40, |r| r.vertical_flow),
            (0x0a, 0x20, |r| r.horizontal_flow),
            (0x13, 0x80, |r| r.four_way_valve_on),
            (0x20, 0x80, |r| r.antifreeze),
            (0x21, 0x80, |r| r.mute),
            (0x28, 0x40, |r| r.heat_mode),
        ];

        for (offset, mask, flag) in cases {
            assert!(flag(&report_with(offset, mask)), "offset {offset:#04x} mask {mask:#04x}");
            assert!(!flag(&report_with(offset, !mask)), "offset {offset:#04x} mask {mask:#04x}");
        }
    }

    #[test]
    fn test_packed_field_positions() {
        assert_eq!(report_with(0x07, 0x05).mode_code, 0x05);
        assert_eq!(report_with(0x07, 0xf8).mode_code, 0x00);
        assert_eq!(report_with(0x08, 0x0f).set_point_whole, 0x0f);
        assert_eq!(report_with(0x08, 0x70).fan_speed_code, 0x07);
        assert_eq!(report_with(0x08, 0x80).fan_speed_code, 0x00);
        assert_eq!(report_with(0x13, 0x03).sleep_code, 0x03);
        assert_eq!(report_with(0x13, 0x7c).sleep_code, 0x00);
        assert_eq!(report_with(0x28, 0x0a).outdoor_running_code, 0x0a);

        assert_eq!(report_with(0x11, 0xff).indoor_temperature_raw, 0xff);
        assert_eq!(report_with(0x1e, 0xff).indoor_heat_exchanger_temperature_raw, 0xff);
        assert_eq!(report_with(0x22, 0x62).indoor_fan_speed_code, 0x62);
        assert_eq!(report_with(0x23, 0xff).outdoor_temperature_raw, 0xff);
        assert_eq!(report_with(0x24, 0xff).condenser_coil_temperature_raw, 0xff);
        assert_eq!(report_with(0x25, 0xff).compressor_discharge_temperature_raw, 0xff);
        assert_eq!(report_with(0x26, 0xff).compressor_frequency, 0xff);
        assert_eq!(report_with(0x27, 0xff).outdoor_fan_speed, 0xff);
        assert_eq!(report_with(0x2d, 0xff).supply_voltage, 0xff);
        assert_eq!(report_with(0x2e, 0xff).current_used_amps, 0xff);
        assert_eq!(report_with(0x33, 0x18).up_down_flow_code, 0x18);
        assert_eq!(report_with(0x34, 0x20).left_right_flow_code, 0x20);
    }

    #[test]
    fn test_all_ones() {
        let bytes = [0xff; REPORT_SIZE];
        let report = StateReport::from_bytes(&bytes).unwrap();

        assert!(report.power && report.eco && report.display && report.strong);
        assert_eq!(report.mode_code, 0x07);
        assert_eq!(report.set_point_whole, 0x0f);
        assert_eq!(report.set_point(), 31.5);
        assert_eq!(report.header.source, 0xffff);
        assert!(report.mode().is_err());
        assert!(report.indoor_fan_speed().is_err());
        assert_eq!(report.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_unknown_regions_retained() {
        let mut bytes = [0x00; REPORT_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(11);
        }

        let report = StateReport::from_bytes(&bytes).unwrap();
        assert_eq!(report.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_decoded_values() {
        let mut bytes = [0x00; REPORT_SIZE];
        bytes[0x07] = 0x15; // power, auto
        bytes[0x08] = 0x16; // low, 16 + 6
        bytes[0x09] = 0x01; // + 0.5
        bytes[0x11] = 100;
        bytes[0x1e] = 110;
        bytes[0x22] = 0x3c;
        bytes[0x23] = 12;
        bytes[0x28] = 0x0a;
        bytes[0x34] = 0x18;

        let report = StateReport::from_bytes(&bytes).unwrap();
        assert!(report.power);
        assert_eq!(report.mode().unwrap(), Mode::Auto);
        assert_eq!(report.fan_speed().unwrap(), FanSpeed::Low);
        assert_eq!(report.set_point(), 22.5);
        assert_eq!(report.indoor_temperature(), 18.5);
        assert_eq!(report.indoor_heat_exchanger_temperature(), 21.5);
        assert_eq!(report.outdoor_temperature(), 12.0);
        assert_eq!(report.indoor_fan_speed().unwrap(), IndoorFanSpeed::Low);
        assert_eq!(report.outdoor_running().unwrap(), OutdoorStatus::Yes);
        assert_eq!(report.left_right_flow().unwrap(), LeftRightFlow::MiddleFlow);
        assert_eq!(report.sleep_mode().unwrap(), SleepMode::Off);
    }

    #[test]
    fn test_short_buffer() {
        assert!(matches!(
            StateReport::from_bytes(&[0xbb; 60]),
            Err(CodecError::FrameTooShort { expected: 61, actual: 60 })
        ));
        assert!(StateReport::from_bytes(&[0x00; 64]).is_ok());
    }
}
