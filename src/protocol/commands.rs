use packed_struct::prelude::*;

use super::codec::{seal, CodecError};
use super::header::{CommandType, Header, Source, HEADER_SIZE, MAGIC, QUERY_COMMAND_SIZE, STATE_COMMAND_SIZE};
use super::settings::{FanSpeed, LeftRightFlow, Mode, Setting, SleepMode, UpDownFlow};
use super::temperature::{self, DegreesC};

/// A frame sent from the controller to the unit.
pub trait Command {
    const TYPE: CommandType;

    /// Whole frame size, header and checksum included.
    const SIZE: usize;

    /// Value of the header's length byte.
    const LENGTH: u8 = (Self::SIZE - HEADER_SIZE - 1) as u8;
}


/// Query as sent by the stock controller.
pub const QUERY_BYTES: [u8; QUERY_COMMAND_SIZE] = [0xbb, 0x00, 0x01, 0x04, 0x02, 0x01, 0x00, 0xbd];

/// Command `0x04` -- Query State (request).
///
/// Constant frame; the unit answers with a [`StateReport`](super::report::StateReport).
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(bit_numbering="msb0", size_bytes="8")]
pub struct QueryCommand {
    #[packed_field(bytes="0:4")]
    pub header: Header,

    #[packed_field(bytes="5:6")]
    pub payload: [u8; 2],

    #[packed_field(bytes="7")]
    pub checksum: u8,
}

impl Command for QueryCommand {
    const TYPE: CommandType = CommandType::QueryState;
    const SIZE: usize = QUERY_COMMAND_SIZE;
}

impl Default for QueryCommand {
    fn default() -> Self {
        Self {
            header: Header {
                magic: MAGIC,
                // the stock controller sends 00 01 here, unlike in state commands
                source: 0x0100,
                command: CommandType::QueryState.to_primitive(),
                length: Self::LENGTH,
            },
            payload: [0x01, 0x00],
            checksum: 0xbd,
        }
    }
}


/// Unexplained constant the stock controller always puts in byte `0c`.
pub const STATE_COMMAND_SENTINEL: u8 = 0x80;

/// Command `0x03` -- Set State (request).
///
/// Carries the complete desired state of the unit. Enumerated settings hold
/// command-side codes, see [`Setting::CODES`].
/// `checksum` is only meaningful after [`StateCommand::finalized`].
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(bit_numbering="msb0", size_bytes="35")]
pub struct StateCommand {
    #[packed_field(bytes="0:4")]
    pub header: Header,

    #[packed_field(bytes="5:6")]
    pub unknown_bytes05: [u8; 2],

    // byte 7

    #[packed_field(bits="56:57")]
    pub unknown_bits56: u8,

    #[packed_field(bits="58")]
    pub power: bool,

    #[packed_field(bits="59:60")]
    pub unknown_bits59: u8,

    /// Always the inverse of `mute` from the stock controller.
    #[packed_field(bits="61")]
    pub beeper: bool,

    #[packed_field(bits="62")]
    pub display: bool,

    #[packed_field(bits="63")]
    pub eco: bool,

    // byte 8

    #[packed_field(bits="64:67")]
    pub mode_code: u8,

    #[packed_field(bits="68")]
    pub health: bool,

    #[packed_field(bits="69")]
    pub unknown_bit69: bool,

    #[packed_field(bits="70")]
    pub strong: bool,

    #[packed_field(bits="71")]
    pub mute: bool,

    /// Whole degrees of the set point, plus 111.
    #[packed_field(bytes="9")]
    pub set_point_whole: u8,

    // byte 10

    #[packed_field(bits="80:82")]
    pub fan_speed_code: u8,

    #[packed_field(bits="83:85")]
    pub vertical_flow: u8,

    #[packed_field(bits="86")]
    pub unknown_bit86: bool,

    #[packed_field(bits="87")]
    pub antifreeze: bool,

    // byte 11

    #[packed_field(bits="88:89")]
    pub unknown_bits88: u8,

    #[packed_field(bits="90")]
    pub set_point_half: bool,

    #[packed_field(bits="91:95")]
    pub unknown_bits91: u8,

    #[packed_field(bytes="12")]
    pub sentinel: u8,

    #[packed_field(bytes="13:18")]
    pub unknown_bytes0d: [u8; 6],

    #[packed_field(bytes="19")]
    pub sleep_code: u8,

    #[packed_field(bytes="20:31")]
    pub unknown_bytes14: [u8; 12],

    #[packed_field(bytes="32")]
    pub up_down_flow_code: u8,

    #[packed_field(bytes="33")]
    pub left_right_flow_code: u8,

    #[packed_field(bytes="34")]
    pub checksum: u8,
}

impl Command for StateCommand {
    const TYPE: CommandType = CommandType::SetState;
    const SIZE: usize = STATE_COMMAND_SIZE;
}

impl Default for StateCommand {
    fn default() -> Self {
        Self {
            header: Header::new(Source::Controller, Self::TYPE, Self::LENGTH),
            unknown_bytes05: [0x00; 2],
            unknown_bits56: 0,
            power: false,
            unknown_bits59: 0,
            beeper: false,
            display: false,
            eco: false,
            mode_code: 0,
            health: false,
            unknown_bit69: false,
            strong: false,
            mute: false,
            set_point_whole: 0,
            fan_speed_code: 0,
            vertical_flow: 0,
            unknown_bit86: false,
            antifreeze: false,
            unknown_bits88: 0,
            set_point_half: false,
            unknown_bits91: 0,
            sentinel: STATE_COMMAND_SENTINEL,
            unknown_bytes0d: [0x00; 6],
            sleep_code: 0,
            unknown_bytes14: [0x00; 12],
            up_down_flow_code: 0,
            left_right_flow_code: 0,
            checksum: 0,
        }
    }
}

impl StateCommand {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let bytes: &[u8; STATE_COMMAND_SIZE] = bytes.get(..STATE_COMMAND_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(CodecError::FrameTooShort { expected: STATE_COMMAND_SIZE, actual: bytes.len() })?;

        Ok(Self::unpack(bytes)?)
    }

    /// Bytes as they stand, with whatever is currently in `checksum`.
    pub fn to_bytes(&self) -> Result<[u8; STATE_COMMAND_SIZE], CodecError> {
        Ok(self.pack()?)
    }

    /// Bytes ready for transmission, with a freshly computed checksum.
    pub fn finalized(&self) -> Result<[u8; STATE_COMMAND_SIZE], CodecError> {
        Ok(seal(self.pack()?))
    }

    pub fn set_point(&self) -> DegreesC {
        temperature::command_set_point(self.set_point_whole, self.set_point_half)
    }

    pub fn set_set_point(&mut self, celsius: DegreesC) -> Result<(), CodecError> {
        let (whole, half) = temperature::command_set_point_fields(celsius)?;
        self.set_point_whole = whole;
        self.set_point_half = half;
        Ok(())
    }

    pub fn mode(&self) -> Result<Mode, CodecError> {
        Mode::CODES.from_command(self.mode_code)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), CodecError> {
        self.mode_code = Mode::CODES.command_code(mode)?;
        Ok(())
    }

    pub fn fan_speed(&self) -> Result<FanSpeed, CodecError> {
        FanSpeed::CODES.from_command(self.fan_speed_code)
    }

    pub fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<(), CodecError> {
        self.fan_speed_code = FanSpeed::CODES.command_code(speed)?;
        Ok(())
    }

    pub fn sleep_mode(&self) -> Result<SleepMode, CodecError> {
        SleepMode::CODES.from_command(self.sleep_code)
    }

    pub fn set_sleep_mode(&mut self, sleep: SleepMode) -> Result<(), CodecError> {
        self.sleep_code = SleepMode::CODES.command_code(sleep)?;
        Ok(())
    }

    pub fn up_down_flow(&self) -> Result<UpDownFlow, CodecError> {
        UpDownFlow::CODES.from_command(self.up_down_flow_code)
    }

    pub fn set_up_down_flow(&mut self, flow: UpDownFlow) -> Result<(), CodecError> {
        self.up_down_flow_code = UpDownFlow::CODES.command_code(flow)?;
        Ok(())
    }

    pub fn left_right_flow(&self) -> Result<LeftRightFlow, CodecError> {
        LeftRightFlow::CODES.from_command(self.left_right_flow_code)
    }

    pub fn set_left_right_flow(&mut self, flow: LeftRightFlow) -> Result<(), CodecError> {
        self.left_right_flow_code = LeftRightFlow::CODES.command_code(flow)?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::checksum;

    #[test]
    fn test_query_default() {
        let query = QueryCommand::default();
        assert_eq!(query.pack().unwrap(), QUERY_BYTES);
        assert_eq!(QueryCommand::LENGTH, 0x02);
        assert_eq!(seal(QUERY_BYTES), QUERY_BYTES);
    }

    #[test]
    fn test_state_command_default() {
        let bytes = StateCommand::default().to_bytes().unwrap();
        assert_eq!(StateCommand::LENGTH, 0x1d);
        assert_eq!(bytes[..5], [0xbb, 0x01, 0x00, 0x03, 0x1d]);
        assert_eq!(bytes[0x0c], 0x80);
        assert!(bytes[5..0x0c].iter().all(|b| *b == 0));
        assert!(bytes[0x0d..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_state_command_bit_positions() {
        let cases: [(fn(&mut StateCommand), usize, u8); 13] = [
            (|c| c.eco = true, 0x07, 0x01),
            (|c| c.display = true, 0x07, 0x02),
            (|c| c.beeper = true, 0x07, 0x04),
            (|c| c.power = true, 0x07, 0x20),
            (|c| c.mute = true, 0x08, 0x01),
            (|c| c.strong = true, 0x08, 0x02),
            (|c| c.health = true, 0x08, 0x08),
            (|c| c.mode_code = 0x0f, 0x08, 0xf0),
            (|c| c.antifreeze = true, 0x0a, 0x01),
            (|c| c.vertical_flow = 0x07, 0x0a, 0x1c),
            (|c| c.fan_speed_code = 0x07, 0x0a, 0xe0),
            (|c| c.set_point_half = true, 0x0b, 0x20),
            (|c| c.sleep_code = 0xff, 0x13, 0xff),
        ];

        for (set, offset, expected) in cases {
            let mut command = StateCommand::default();
            set(&mut command);
            let bytes = command.to_bytes().unwrap();
            assert_eq!(bytes[offset], expected, "offset {offset:#04x}");
        }
    }

    #[test]
    fn test_state_command_settings() {
        let mut command = StateCommand::default();
        command.set_mode(Mode::Auto).unwrap();
        command.set_fan_speed(FanSpeed::MidLow).unwrap();
        command.set_up_down_flow(UpDownFlow::DownFlow).unwrap();
        command.set_left_right_flow(LeftRightFlow::RightFlow).unwrap();
        command.set_sleep_mode(SleepMode::Child).unwrap();
        command.set_set_point(22.5).unwrap();

        let bytes = command.to_bytes().unwrap();
        assert_eq!(bytes[0x08] >> 4, 0x08);
        assert_eq!(bytes[0x0a] >> 5, 0x06);
        assert_eq!(bytes[0x09], 133);
        assert_eq!(bytes[0x0b], 0x20);
        assert_eq!(bytes[0x13], 0x03);
        assert_eq!(bytes[0x20], 0x18);
        assert_eq!(bytes[0x21], 0xa0);

        assert_eq!(command.mode().unwrap(), Mode::Auto);
        assert_eq!(command.fan_speed().unwrap(), FanSpeed::MidLow);
        assert_eq!(command.set_point(), 22.5);

        assert!(command.set_set_point(31.0).is_err());
        assert_eq!(command.set_point(), 22.5);
    }

    #[test]
    fn test_state_command_finalized() {
        let mut command = StateCommand::default();
        command.power = true;
        command.mute = true;

        let bytes = command.finalized().unwrap();
        assert_eq!(bytes[34], checksum(&bytes));
        assert_eq!(bytes.iter().fold(0, |acc, b| acc ^ b), 0x00);
        // the stored checksum is left alone
        assert_eq!(command.checksum, 0);

        let parsed = StateCommand::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.checksum, bytes[34]);
        assert!(parsed.power && parsed.mute);

        assert!(matches!(
            StateCommand::from_bytes(&bytes[..34]),
            Err(CodecError::FrameTooShort { expected: 35, actual: 34 })
        ));
    }
}
