//! Logical settings and the byte codes the unit uses for them.
//!
//! The same setting is coded differently in reports and in state commands,
//! so each setting carries a table of `(value, report code, command code)`.

use packed_struct::prelude::*;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::codec::CodecError;

/// Report/command code pairs for one setting.
#[derive(Debug)]
pub struct CodeTable<T: 'static> {
    setting: &'static str,
    codes: &'static [(T, u8, u8)],
}

impl<T: 'static> CodeTable<T> {
    pub const fn new(setting: &'static str, codes: &'static [(T, u8, u8)]) -> Self {
        Self { setting, codes }
    }
}

impl<T> CodeTable<T> where
    T: 'static + Copy + PartialEq + Into<&'static str>
{
    pub fn from_report(&self, code: u8) -> Result<T, CodecError> {
        self.codes.iter()
            .find(|(_, report, _)| *report == code)
            .map(|(value, _, _)| *value)
            .ok_or(CodecError::UnknownCode { setting: self.setting, code })
    }

    pub fn from_command(&self, code: u8) -> Result<T, CodecError> {
        self.codes.iter()
            .find(|(_, _, command)| *command == code)
            .map(|(value, _, _)| *value)
            .ok_or(CodecError::UnknownCode { setting: self.setting, code })
    }

    pub fn report_code(&self, value: T) -> Result<u8, CodecError> {
        self.entry(value).map(|(_, report, _)| *report)
    }

    pub fn command_code(&self, value: T) -> Result<u8, CodecError> {
        self.entry(value).map(|(_, _, command)| *command)
    }

    pub fn report_to_command(&self, code: u8) -> Result<u8, CodecError> {
        self.command_code(self.from_report(code)?)
    }

    pub fn command_to_report(&self, code: u8) -> Result<u8, CodecError> {
        self.report_code(self.from_command(code)?)
    }

    fn entry(&self, value: T) -> Result<&(T, u8, u8), CodecError> {
        self.codes.iter()
            .find(|(v, _, _)| *v == value)
            .ok_or(CodecError::MissingCode { setting: self.setting, value: value.into() })
    }
}

/// A setting that can be both reported and commanded.
pub trait Setting: Copy + PartialEq + Into<&'static str> + 'static {
    const CODES: CodeTable<Self>;
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Mode {
    Auto,
    Heat,
    Cool,
    Dehumidify,
    Fan,
}

impl Setting for Mode {
    const CODES: CodeTable<Self> = CodeTable::new("mode", &[
        (Mode::Auto, 0x05, 0x08),
        (Mode::Heat, 0x04, 0x01),
        (Mode::Cool, 0x01, 0x03),
        (Mode::Dehumidify, 0x03, 0x02),
        (Mode::Fan, 0x02, 0x07),
    ]);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum FanSpeed {
    Auto,
    Low,
    Medium,
    MidLow,
    MidHigh,
    High,
}

impl Setting for FanSpeed {
    const CODES: CodeTable<Self> = CodeTable::new("fan speed", &[
        (FanSpeed::Auto, 0x00, 0x00),
        (FanSpeed::Low, 0x01, 0x02),
        (FanSpeed::Medium, 0x02, 0x03),
        (FanSpeed::MidLow, 0x04, 0x06),
        (FanSpeed::MidHigh, 0x05, 0x07),
        (FanSpeed::High, 0x03, 0x05),
    ]);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SleepMode {
    Off,
    Standard,
    Elderly,
    Child,
}

impl Setting for SleepMode {
    const CODES: CodeTable<Self> = CodeTable::new("sleep mode", &[
        (SleepMode::Off, 0x00, 0x00),
        (SleepMode::Standard, 0x01, 0x01),
        (SleepMode::Elderly, 0x02, 0x02),
        (SleepMode::Child, 0x03, 0x03),
    ]);
}

/// Vertical louver position or swing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum UpDownFlow {
    Auto,
    TopFix,
    UpperFix,
    MiddleFix,
    LowerFix,
    BottomFix,
    UpDownFlow,
    UpFlow,
    DownFlow,
}

impl Setting for UpDownFlow {
    const CODES: CodeTable<Self> = CodeTable::new("up/down flow", &[
        (UpDownFlow::Auto, 0x00, 0x00),
        (UpDownFlow::TopFix, 0x01, 0x01),
        (UpDownFlow::UpperFix, 0x02, 0x02),
        (UpDownFlow::MiddleFix, 0x03, 0x03),
        (UpDownFlow::LowerFix, 0x04, 0x04),
        (UpDownFlow::BottomFix, 0x05, 0x05),
        (UpDownFlow::UpDownFlow, 0x08, 0x08),
        (UpDownFlow::UpFlow, 0x10, 0x10),
        (UpDownFlow::DownFlow, 0x18, 0x18),
    ]);
}

/// Horizontal louver position or swing. Command codes are the report codes
/// with the high bit set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum LeftRightFlow {
    Auto,
    LeftFix,
    MiddleLeftFix,
    MiddleFix,
    MiddleRightFix,
    RightFix,
    LeftRightFlow,
    LeftFlow,
    MiddleFlow,
    RightFlow,
}

impl Setting for LeftRightFlow {
    const CODES: CodeTable<Self> = CodeTable::new("left/right flow", &[
        (LeftRightFlow::Auto, 0x00, 0x80),
        (LeftRightFlow::LeftFix, 0x01, 0x81),
        (LeftRightFlow::MiddleLeftFix, 0x02, 0x82),
        (LeftRightFlow::MiddleFix, 0x03, 0x83),
        (LeftRightFlow::MiddleRightFix, 0x04, 0x84),
        (LeftRightFlow::RightFix, 0x05, 0x85),
        (LeftRightFlow::LeftRightFlow, 0x08, 0x88),
        (LeftRightFlow::LeftFlow, 0x10, 0x90),
        (LeftRightFlow::MiddleFlow, 0x18, 0x98),
        (LeftRightFlow::RightFlow, 0x20, 0xa0),
    ]);
}


/// Actual indoor fan speed, only ever reported.
#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum IndoorFanSpeed {
    Off = 0x00,
    Low = 0x3c,
    Medium = 0x55,
    High = 0x62,
}

/// Whether the outdoor unit is running, only ever reported.
#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum OutdoorStatus {
    No = 0x00,
    Yes = 0x0a,
}


#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn assert_complete<T: Setting + IntoEnumIterator + std::fmt::Debug>() {
        for value in T::iter() {
            let report = T::CODES.report_code(value).unwrap();
            let command = T::CODES.command_code(value).unwrap();
            assert_eq!(T::CODES.from_report(report).unwrap(), value);
            assert_eq!(T::CODES.from_command(command).unwrap(), value);
        }
    }

    #[test]
    fn test_tables_cover_every_variant() {
        assert_complete::<Mode>();
        assert_complete::<FanSpeed>();
        assert_complete::<SleepMode>();
        assert_complete::<UpDownFlow>();
        assert_complete::<LeftRightFlow>();
    }

    #[test]
    fn test_mode_codes() {
        assert_eq!(Mode::CODES.report_to_command(0x05).unwrap(), 0x08);
        assert_eq!(Mode::CODES.report_to_command(0x04).unwrap(), 0x01);
        assert_eq!(Mode::CODES.report_to_command(0x01).unwrap(), 0x03);
        assert_eq!(Mode::CODES.report_to_command(0x03).unwrap(), 0x02);
        assert_eq!(Mode::CODES.report_to_command(0x02).unwrap(), 0x07);
        assert_eq!(Mode::CODES.command_to_report(0x08).unwrap(), 0x05);
    }

    #[test]
    fn test_fan_speed_codes() {
        assert_eq!(FanSpeed::CODES.report_to_command(0x01).unwrap(), 0x02);
        assert_eq!(FanSpeed::CODES.report_to_command(0x02).unwrap(), 0x03);
        assert_eq!(FanSpeed::CODES.report_to_command(0x03).unwrap(), 0x05);
        assert_eq!(FanSpeed::CODES.report_to_command(0x04).unwrap(), 0x06);
        assert_eq!(FanSpeed::CODES.report_to_command(0x05).unwrap(), 0x07);
    }

    #[test]
    fn test_left_right_flow_offset() {
        for value in LeftRightFlow::iter() {
            let report = LeftRightFlow::CODES.report_code(value).unwrap();
            assert_eq!(LeftRightFlow::CODES.command_code(value).unwrap(), report + 0x80);
        }
        assert_eq!(LeftRightFlow::CODES.report_to_command(0x20).unwrap(), 0xa0);
    }

    #[test]
    fn test_unknown_codes() {
        match Mode::CODES.from_report(0x00) {
            Err(CodecError::UnknownCode { setting, code }) => {
                assert_eq!(setting, "mode");
                assert_eq!(code, 0x00);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(FanSpeed::CODES.report_to_command(0x06).is_err());
        assert!(LeftRightFlow::CODES.from_command(0x20).is_err());
        assert!(SleepMode::CODES.from_report(0x04).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("mid-high".parse::<FanSpeed>().unwrap(), FanSpeed::MidHigh);
        assert_eq!("dehumidify".parse::<Mode>().unwrap(), Mode::Dehumidify);
        assert_eq!(LeftRightFlow::MiddleLeftFix.to_string(), "middle-left-fix");
        assert_eq!(IndoorFanSpeed::from_primitive(0x55), Some(IndoorFanSpeed::Medium));
        assert_eq!(OutdoorStatus::from_primitive(0x01), None);
    }
}
