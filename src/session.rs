//! Tracks the unit's last reported state and a pending state command.
//!
//! Getters read the last report. Setters edit the pending command, which is
//! seeded from the last report on first use and sent by
//! [`Session::apply_settings`].

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{ControllerPort, Transport, DEFAULT_RESPONSE_TIMEOUT};
use crate::protocol::codec::{command_from_report, CodecError, ControllerCodec, TxFrame};
use crate::protocol::commands::{QueryCommand, StateCommand};
use crate::protocol::header::{REPORT_SIZE, STATE_COMMAND_SIZE};
use crate::protocol::report::StateReport;
use crate::protocol::settings::{FanSpeed, IndoorFanSpeed, LeftRightFlow, Mode, SleepMode, UpDownFlow};
use crate::protocol::temperature::DegreesC;


#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no state report received yet")]
    NoReport,
    #[error("no pending command")]
    NoPendingCommand,
    #[error("session has no port attached")]
    NoPort,
    #[error("short read (expected {expected} bytes, got {actual})")]
    ShortRead {
        expected: usize,
        actual: usize,
    },
    #[error("timed out waiting for a state report")]
    Timeout,
    #[error(transparent)]
    Codec(CodecError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::FrameTooShort { expected, actual } => SessionError::ShortRead { expected, actual },
            CodecError::Io(err) => SessionError::Io(err),
            err => SessionError::Codec(err),
        }
    }
}


/// The state command being built, if any.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PendingCommand {
    #[default]
    Absent,
    Building(StateCommand),
}


pub struct Session {
    report: Option<StateReport>,
    pending: PendingCommand,
    port: Option<ControllerPort>,
    response_timeout: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session without a port. Reports are fed in with
    /// [`Session::set_state_from_bytes`] and commands taken out with
    /// [`Session::command_bytes`].
    pub fn new() -> Self {
        Self {
            report: None,
            pending: PendingCommand::Absent,
            port: None,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub fn with_port(port: ControllerPort) -> Self {
        Self {
            port: Some(port),
            ..Self::new()
        }
    }

    /// Attaches a raw transport, framing it for the controller side.
    pub fn with_transport<T: Transport + 'static>(transport: T) -> Self {
        let transport: Box<dyn Transport> = Box::new(transport);
        Self::with_port(ControllerPort::new(transport, ControllerCodec))
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    /// Queries the unit and replaces the stored report with its answer.
    pub async fn poll_state(&mut self) -> Result<&StateReport, SessionError> {
        let port = self.port.as_mut().ok_or(SessionError::NoPort)?;

        // drop anything left over from an earlier, abandoned read
        port.read_buffer_mut().clear();

        debug!("polling state");
        port.send(TxFrame::Query(QueryCommand::default())).await?;

        let report = match timeout(self.response_timeout, port.next()).await {
            Err(_) => return Err(SessionError::Timeout),
            Ok(None) => return Err(SessionError::ShortRead { expected: REPORT_SIZE, actual: 0 }),
            Ok(Some(report)) => report?,
        };

        Ok(self.store_report(report))
    }

    /// Sends the pending command, then polls for the state it produced.
    ///
    /// The pending command is discarded once taken, whether or not the send
    /// and the follow-up poll succeed.
    pub async fn apply_settings(&mut self) -> Result<&StateReport, SessionError> {
        let port = self.port.as_mut().ok_or(SessionError::NoPort)?;

        let command = match std::mem::take(&mut self.pending) {
            PendingCommand::Building(command) => command,
            PendingCommand::Absent => return Err(SessionError::NoPendingCommand),
        };

        info!(
            "applying settings: power {}, mode {:#04x}, set point {}C",
            command.power, command.mode_code, command.set_point()
        );
        port.send(TxFrame::State(command)).await?;

        self.poll_state().await
    }

    /// Decodes a report received by other means and makes it current.
    pub fn set_state_from_bytes(&mut self, bytes: &[u8]) -> Result<&StateReport, SessionError> {
        let report = StateReport::from_bytes(bytes)?;
        Ok(self.store_report(report))
    }

    fn store_report(&mut self, report: StateReport) -> &StateReport {
        if !report.header.has_magic() {
            warn!("report has unexpected magic byte {:#04x}", report.header.magic);
        }

        self.report.insert(report)
    }

    pub fn report(&self) -> Result<&StateReport, SessionError> {
        self.report.as_ref().ok_or(SessionError::NoReport)
    }

    pub fn is_power_on(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.power)
    }

    pub fn is_eco(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.eco)
    }

    pub fn is_display_on(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.display)
    }

    pub fn is_strong(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.strong)
    }

    pub fn is_health(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.health)
    }

    pub fn is_mute(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.mute)
    }

    /// Whether the louvers are swinging vertically.
    pub fn is_vertical_flow(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.vertical_flow)
    }

    /// Whether the louvers are swinging horizontally.
    pub fn is_horizontal_flow(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.horizontal_flow)
    }

    pub fn is_four_way_valve_on(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.four_way_valve_on)
    }

    pub fn is_antifreeze(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.antifreeze)
    }

    /// Whether the unit is currently heating.
    pub fn is_heat_mode(&self) -> Result<bool, SessionError> {
        Ok(self.report()?.heat_mode)
    }

    pub fn mode(&self) -> Result<Mode, SessionError> {
        Ok(self.report()?.mode()?)
    }

    pub fn chosen_fan_speed(&self) -> Result<FanSpeed, SessionError> {
        Ok(self.report()?.fan_speed()?)
    }

    pub fn chosen_temperature(&self) -> Result<DegreesC, SessionError> {
        Ok(self.report()?.set_point())
    }

    pub fn indoor_temperature(&self) -> Result<DegreesC, SessionError> {
        Ok(self.report()?.indoor_temperature())
    }

    pub fn indoor_heat_exchanger_temperature(&self) -> Result<DegreesC, SessionError> {
        Ok(self.report()?.indoor_heat_exchanger_temperature())
    }

    pub fn outdoor_temperature(&self) -> Result<DegreesC, SessionError> {
        Ok(self.report()?.outdoor_temperature())
    }

    pub fn condenser_coil_temperature(&self) -> Result<DegreesC, SessionError> {
        Ok(self.report()?.condenser_coil_temperature())
    }

    pub fn compressor_discharge_temperature(&self) -> Result<DegreesC, SessionError> {
        Ok(self.report()?.compressor_discharge_temperature())
    }

    pub fn compressor_frequency(&self) -> Result<u8, SessionError> {
        Ok(self.report()?.compressor_frequency)
    }

    /// Actual speed of the indoor fan, as opposed to the chosen setting.
    pub fn indoor_fan_speed(&self) -> Result<IndoorFanSpeed, SessionError> {
        Ok(self.report()?.indoor_fan_speed()?)
    }

    pub fn outdoor_fan_speed(&self) -> Result<u8, SessionError> {
        Ok(self.report()?.outdoor_fan_speed)
    }

    pub fn supply_voltage(&self) -> Result<u8, SessionError> {
        Ok(self.report()?.supply_voltage)
    }

    pub fn current_used_amps(&self) -> Result<u8, SessionError> {
        Ok(self.report()?.current_used_amps)
    }

    pub fn up_down_flow(&self) -> Result<UpDownFlow, SessionError> {
        Ok(self.report()?.up_down_flow()?)
    }

    pub fn left_right_flow(&self) -> Result<LeftRightFlow, SessionError> {
        Ok(self.report()?.left_right_flow()?)
    }

    pub fn sleep_mode(&self) -> Result<SleepMode, SessionError> {
        Ok(self.report()?.sleep_mode()?)
    }

    /// Starts a new pending command from the current report, replacing any
    /// command already pending.
    pub fn begin_command(&mut self) -> Result<&mut StateCommand, SessionError> {
        let command = command_from_report(self.report()?)?;
        self.pending = PendingCommand::Building(command);
        self.pending_mut()
    }

    fn pending_mut(&mut self) -> Result<&mut StateCommand, SessionError> {
        match self.pending {
            PendingCommand::Building(ref mut command) => Ok(command),
            PendingCommand::Absent => self.begin_command(),
        }
    }

    pub fn has_pending_command(&self) -> bool {
        matches!(self.pending, PendingCommand::Building(_))
    }

    pub fn pending_command(&self) -> Result<&StateCommand, SessionError> {
        match &self.pending {
            PendingCommand::Building(command) => Ok(command),
            PendingCommand::Absent => Err(SessionError::NoPendingCommand),
        }
    }

    /// Set point held by the pending command.
    pub fn pending_chosen_temperature(&self) -> Result<DegreesC, SessionError> {
        Ok(self.pending_command()?.set_point())
    }

    /// The pending command, checksummed and ready to send.
    pub fn command_bytes(&self) -> Result<[u8; STATE_COMMAND_SIZE], SessionError> {
        Ok(self.pending_command()?.finalized()?)
    }

    /// Drops settings that have not been applied.
    pub fn clear_pending_command(&mut self) {
        self.pending = PendingCommand::Absent;
    }

    pub fn set_power_on(&mut self, power: bool) -> Result<(), SessionError> {
        self.pending_mut()?.power = power;
        Ok(())
    }

    pub fn set_eco(&mut self, eco: bool) -> Result<(), SessionError> {
        self.pending_mut()?.eco = eco;
        Ok(())
    }

    pub fn set_display_on(&mut self, display: bool) -> Result<(), SessionError> {
        self.pending_mut()?.display = display;
        Ok(())
    }

    pub fn set_strong(&mut self, strong: bool) -> Result<(), SessionError> {
        self.pending_mut()?.strong = strong;
        Ok(())
    }

    pub fn set_health(&mut self, health: bool) -> Result<(), SessionError> {
        self.pending_mut()?.health = health;
        Ok(())
    }

    /// Only the mute bit changes; the beeper keeps its seeded value.
    pub fn set_mute(&mut self, mute: bool) -> Result<(), SessionError> {
        self.pending_mut()?.mute = mute;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SessionError> {
        Ok(self.pending_mut()?.set_mode(mode)?)
    }

    pub fn set_chosen_fan_speed(&mut self, speed: FanSpeed) -> Result<(), SessionError> {
        Ok(self.pending_mut()?.set_fan_speed(speed)?)
    }

    /// Accepts `[10.0, 30.0]` in half degree steps; anything finer rounds down.
    pub fn set_chosen_temperature(&mut self, celsius: DegreesC) -> Result<(), SessionError> {
        Ok(self.pending_mut()?.set_set_point(celsius)?)
    }

    pub fn set_up_down_flow(&mut self, flow: UpDownFlow) -> Result<(), SessionError> {
        Ok(self.pending_mut()?.set_up_down_flow(flow)?)
    }

    pub fn set_left_right_flow(&mut self, flow: LeftRightFlow) -> Result<(), SessionError> {
        Ok(self.pending_mut()?.set_left_right_flow(flow)?)
    }

    pub fn set_sleep_mode(&mut self, sleep: SleepMode) -> Result<(), SessionError> {
        Ok(self.pending_mut()?.set_sleep_mode(sleep)?)
    }
}
