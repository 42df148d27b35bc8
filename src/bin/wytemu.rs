use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use futures::{SinkExt, TryStreamExt};
use pioneer_wyt::protocol::{
    codec::{apply_command, ApplianceCodec, RxCommand},
    header::{CommandType, Header, Source, HEADER_SIZE, REPORT_SIZE},
    report::StateReport,
    settings::*,
    temperature,
};
use rand::Rng;
use tokio::{net::{TcpListener, TcpStream}, sync::Mutex};
use tokio_util::codec::Framed;
use tracing::{info, warn, debug};
use tracing_subscriber::EnvFilter;

/// Emulator for the WYT main control board
///
/// Listens for tcp+raw connections and answers queries and state commands
/// the way the indoor unit does. Every connection shares one unit.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3456")]
    listen: SocketAddr,
}


#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let unit = Arc::new(Mutex::new(initial_state()?));

    let listener = TcpListener::bind(args.listen).await?;
    info!("emulating a WYT unit on tcp+raw://{}", listener.local_addr()?);

    loop {
        let (socket, peer) = listener.accept().await?;
        socket.set_nodelay(true)?;

        info!("controller connected from {peer}");

        let unit = unit.clone();
        tokio::spawn(async move {
            if let Err(err) = unit_emulator(socket, unit).await {
                warn!("connection from {peer} failed: {err}");
            }

            info!("controller {peer} disconnected");
        });
    }
}


fn initial_state() -> Result<StateReport> {
    let mut state = StateReport::from_bytes(&[0x00; REPORT_SIZE])?;

    state.header = Header::new(Source::Appliance, CommandType::QueryState, (REPORT_SIZE - HEADER_SIZE - 1) as u8);

    state.power = true;
    state.display = true;
    state.mode_code = Mode::CODES.report_code(Mode::Heat)?;
    state.heat_mode = true;
    state.fan_speed_code = FanSpeed::CODES.report_code(FanSpeed::Auto)?;

    let (whole, half) = temperature::report_set_point_fields(21.5)?;
    state.set_point_whole = whole;
    state.set_point_half = half;

    state.sleep_code = SleepMode::CODES.report_code(SleepMode::Off)?;
    state.up_down_flow_code = UpDownFlow::CODES.report_code(UpDownFlow::Auto)?;
    state.left_right_flow_code = LeftRightFlow::CODES.report_code(LeftRightFlow::Auto)?;

    state.indoor_temperature_raw = 100; // 18.5C
    state.indoor_heat_exchanger_temperature_raw = 150;
    state.outdoor_temperature_raw = 8;
    state.condenser_coil_temperature_raw = 5;
    state.compressor_discharge_temperature_raw = 45;
    state.compressor_frequency = 38;
    state.indoor_fan_speed_code = IndoorFanSpeed::Low as u8;
    state.outdoor_fan_speed = 40;
    state.outdoor_running_code = OutdoorStatus::Yes as u8;
    state.supply_voltage = 230;
    state.current_used_amps = 3;

    Ok(state)
}

/// Nudges the sensor readings so consecutive reports differ.
fn drift(state: &mut StateReport) {
    let mut rng = rand::thread_rng();

    state.indoor_temperature_raw = state.indoor_temperature_raw.saturating_add_signed(rng.gen_range(-1..=1));
    state.outdoor_temperature_raw = state.outdoor_temperature_raw.saturating_add_signed(rng.gen_range(-1..=1));
    state.compressor_frequency = state.compressor_frequency.saturating_add_signed(rng.gen_range(-2..=2));
}


async fn unit_emulator(socket: TcpStream, unit: Arc<Mutex<StateReport>>) -> Result<()> {
    let mut port = Framed::new(socket, ApplianceCodec);

    while let Some(command) = port.try_next().await? {
        match command {
            RxCommand::Query(_) => {
                let report = {
                    let mut state = unit.lock().await;
                    drift(&mut state);
                    *state
                };

                debug!("answering query, indoor at {:.1}C", report.indoor_temperature());

                port.send(report).await?;
            }

            RxCommand::State(command) => {
                let mut state = unit.lock().await;

                match apply_command(&state, &command) {
                    Ok(next) => {
                        *state = next;

                        info!("{} power {} mode {} set point {}C fan {}",
                            "state changed:".green(),
                            next.power,
                            next.mode().map(|m| m.to_string()).unwrap_or_else(|err| err.to_string()),
                            next.set_point(),
                            next.fan_speed().map(|f| f.to_string()).unwrap_or_else(|err| err.to_string()),
                        );
                    }
                    Err(err) => warn!("{} {err}", "rejected state command:".red()),
                }
            }

            RxCommand::Unknown(frame) => {
                warn!("ignoring unknown command {:02x?}", frame);
            }

            RxCommand::Corrupted(frame) => {
                warn!("{} {:02x?}", "bad checksum:".red(), frame);
            }
        }
    }

    Ok(())
}
