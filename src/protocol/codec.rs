use bytes::{Buf, BufMut, BytesMut};
use packed_struct::{PackedStruct, PackedStructSlice};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use super::commands::{Command, QueryCommand, StateCommand, QUERY_BYTES};
use super::header::{CommandType, Header, Source, HEADER_SIZE, MAGIC, QUERY_COMMAND_SIZE, REPORT_SIZE, STATE_COMMAND_SIZE};
use super::report::StateReport;
use super::settings::{FanSpeed, LeftRightFlow, Mode, Setting, SleepMode, UpDownFlow};
use super::temperature;


#[derive(Error, Debug)]
pub enum CodecError {
    #[error("frame too short (expected {expected} bytes, got {actual})")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },
    #[error("temperature {0}C out of range")]
    TemperatureOutOfRange(f32),
    #[error("no {setting} setting has code {code:#04x}")]
    UnknownCode {
        setting: &'static str,
        code: u8,
    },
    #[error("{setting} setting {value} has no code")]
    MissingCode {
        setting: &'static str,
        value: &'static str,
    },
    #[error("packing error: {0}")]
    Packing(#[from] packed_struct::PackingError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}


pub trait Checksum {
    fn checksum(&mut self) -> u8;
}

impl <'a>Checksum for std::slice::Iter<'a, u8> {
    fn checksum(&mut self) -> u8 {
        self.fold(0, |acc, byte| acc ^ byte)
    }
}

/// XOR of every byte of a state command except the trailing checksum.
pub fn checksum(command: &[u8; STATE_COMMAND_SIZE]) -> u8 {
    command[..STATE_COMMAND_SIZE - 1].iter().checksum()
}

/// Writes the checksum of a command frame into its last byte.
pub fn seal<const N: usize>(mut frame: [u8; N]) -> [u8; N] {
    frame[N - 1] = frame[..N - 1].iter().checksum();
    frame
}

pub fn decode_report(bytes: &[u8]) -> Result<StateReport, CodecError> {
    StateReport::from_bytes(bytes)
}

pub fn build_query() -> [u8; QUERY_COMMAND_SIZE] {
    QUERY_BYTES
}

/// Builds a state command reproducing the reported state.
///
/// Fails if the report holds a setting code with no command counterpart, or a
/// set point outside what a command can carry.
pub fn command_from_report(report: &StateReport) -> Result<StateCommand, CodecError> {
    let mut command = StateCommand::default();

    command.power = report.power;
    command.eco = report.eco;
    command.display = report.display;
    command.strong = report.strong;
    command.health = report.health;
    command.mute = report.mute;
    // a muted unit starts with the beeper off
    command.beeper = !report.mute;
    command.antifreeze = report.antifreeze;
    command.vertical_flow = report.vertical_flow as u8;

    command.mode_code = Mode::CODES.report_to_command(report.mode_code)?;
    command.fan_speed_code = FanSpeed::CODES.report_to_command(report.fan_speed_code)?;
    command.sleep_code = SleepMode::CODES.report_to_command(report.sleep_code)?;
    command.up_down_flow_code = UpDownFlow::CODES.report_to_command(report.up_down_flow_code)?;
    command.left_right_flow_code = LeftRightFlow::CODES.report_to_command(report.left_right_flow_code)?;

    command.set_set_point(report.set_point())?;

    command.checksum = checksum(&command.to_bytes()?);

    Ok(command)
}

/// Applies a state command to a report, the way the unit would.
///
/// Sensor readings and unexplained regions are left as they are.
pub fn apply_command(report: &StateReport, command: &StateCommand) -> Result<StateReport, CodecError> {
    let mut report = *report;

    report.power = command.power;
    report.eco = command.eco;
    report.display = command.display;
    report.strong = command.strong;
    report.health = command.health;
    report.mute = command.mute;
    report.antifreeze = command.antifreeze;
    report.vertical_flow = command.vertical_flow != 0;

    report.mode_code = Mode::CODES.command_to_report(command.mode_code)?;
    report.fan_speed_code = FanSpeed::CODES.command_to_report(command.fan_speed_code)?;
    report.sleep_code = SleepMode::CODES.command_to_report(command.sleep_code)?;
    report.up_down_flow_code = UpDownFlow::CODES.command_to_report(command.up_down_flow_code)?;
    report.left_right_flow_code = LeftRightFlow::CODES.command_to_report(command.left_right_flow_code)?;

    let (whole, half) = temperature::report_set_point_fields(command.set_point())?;
    report.set_point_whole = whole;
    report.set_point_half = half;

    Ok(report)
}


/// A frame to send to the unit
#[derive(Clone, Debug)]
pub enum TxFrame {
    Query(QueryCommand),
    State(StateCommand),
}

impl From<QueryCommand> for TxFrame {
    fn from(value: QueryCommand) -> Self {
        TxFrame::Query(value)
    }
}

impl From<StateCommand> for TxFrame {
    fn from(value: StateCommand) -> Self {
        TxFrame::State(value)
    }
}


/// Controller side of the serial line: encodes commands, decodes reports.
///
/// Reports carry no checksum, so a frame starts only where a report header
/// (magic, appliance source, report length) is found. Leading bytes that do
/// not start one, such as the tail of a report abandoned by a timed-out poll,
/// are dropped.
#[derive(Debug, Default)]
pub struct ControllerCodec;

impl Decoder for ControllerCodec {
    type Item = StateReport;

    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match src.iter().position(|&byte| byte == MAGIC) {
                Some(0) => {}
                Some(start) => {
                    debug!("skipping {start} bytes before report header: {:02x?}", &src[..start]);
                    src.advance(start);
                }
                None => {
                    if !src.is_empty() {
                        debug!("skipping {} bytes with no report header: {:02x?}", src.len(), &src[..]);
                        src.clear();
                    }
                    return Ok(None);
                }
            }

            if src.len() < HEADER_SIZE {
                return Ok(None);
            }

            let header = Header::unpack_from_slice(&src[..HEADER_SIZE])?;
            if header.source_kind() != Some(Source::Appliance) || header.frame_size() != REPORT_SIZE {
                // magic byte inside some other data
                src.advance(1);
                continue;
            }

            if src.len() < REPORT_SIZE {
                src.reserve(REPORT_SIZE - src.len());
                return Ok(None);
            }

            let frame = src.split_to(REPORT_SIZE);

            trace!("RX {:02x?}", &frame[..]);

            return decode_report(&frame).map(Some);
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(report) => Ok(Some(report)),
            None if buf.is_empty() => Ok(None),
            None => {
                let actual = buf.len();
                buf.clear();
                Err(CodecError::FrameTooShort { expected: REPORT_SIZE, actual })
            }
        }
    }
}

impl Encoder<TxFrame> for ControllerCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: TxFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();

        match frame {
            TxFrame::Query(query) => dst.put_slice(&seal(query.pack()?)),
            TxFrame::State(command) => dst.put_slice(&command.finalized()?),
        }

        trace!("TX {:02x?}", &dst[start..]);

        Ok(())
    }
}


/// A received command frame
#[derive(Clone, Debug)]
pub enum RxCommand {
    Query(QueryCommand),
    State(StateCommand),
    /// Well formed and correctly checksummed, but not understood.
    Unknown(Vec<u8>),
    /// Checksum mismatch.
    Corrupted(Vec<u8>),
}


/// Appliance side of the serial line: decodes commands, encodes reports.
#[derive(Debug, Default)]
pub struct ApplianceCodec;

impl Decoder for ApplianceCodec {
    type Item = RxCommand;

    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < HEADER_SIZE {
                return Ok(None);
            }

            if src[0] != MAGIC {
                // lost sync -- skip junk until the next magic byte
                src.advance(1);
                continue;
            }

            let header = Header::unpack_from_slice(&src[..HEADER_SIZE])?;
            let size = header.frame_size();

            if src.len() < size {
                src.reserve(size - src.len());
                return Ok(None);
            }

            let frame = src.split_to(size);

            trace!("RX {:02x?}", &frame[..]);

            let expected = frame[..size - 1].iter().checksum();
            let actual = frame[size - 1];
            if expected != actual {
                return Ok(Some(RxCommand::Corrupted(frame.to_vec())));
            }

            let command = match (header.command_type(), size) {
                (Some(CommandType::QueryState), QueryCommand::SIZE) => {
                    RxCommand::Query(QueryCommand::unpack_from_slice(&frame)?)
                }
                (Some(CommandType::SetState), StateCommand::SIZE) => {
                    RxCommand::State(StateCommand::unpack_from_slice(&frame)?)
                }
                _ => RxCommand::Unknown(frame.to_vec()),
            };

            return Ok(Some(command));
        }
    }
}

impl Encoder<StateReport> for ApplianceCodec {
    type Error = CodecError;

    fn encode(&mut self, report: StateReport, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = report.to_bytes()?;
        dst.put_slice(&bytes);

        trace!("TX {:02x?}", &bytes[..]);

        Ok(())
    }
}
