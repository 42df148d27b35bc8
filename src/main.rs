use std::{fmt::Display, time::Duration};

use anyhow::{Result, Context, bail};
use clap::{builder::BoolishValueParser, Parser, Subcommand};
use colored::{Colorize, ColoredString};
use pioneer_wyt::{
    config::Port,
    protocol::{codec::CodecError, report::StateReport, settings::*},
    session::{Session, SessionError},
};
use tokio::time::sleep;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;


/// Reads and changes the state of a Pioneer WYT heat pump over its serial line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the port to connect to
    ///
    /// either serial:///device/path or tcp+raw://host:port URLs supported
    port: Url,

    /// How long to wait for the unit to answer a query, in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print the unit's current state
    Status,

    /// Keep polling the unit, printing every report
    Watch {
        /// Delay between polls, in milliseconds
        #[arg(long, default_value_t = 5000)]
        interval_ms: u64,
    },

    /// Change settings; anything not given keeps its current value
    Set(SetArgs),
}

#[derive(clap::Args, Debug)]
struct SetArgs {
    #[arg(long, value_parser = BoolishValueParser::new())]
    power: Option<bool>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    eco: Option<bool>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    display: Option<bool>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    strong: Option<bool>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    health: Option<bool>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    mute: Option<bool>,

    /// auto, heat, cool, dehumidify or fan
    #[arg(long)]
    mode: Option<Mode>,

    /// auto, low, mid-low, medium, mid-high or high
    #[arg(long)]
    fan: Option<FanSpeed>,

    /// Set point in Celsius, 10 to 30 in half degree steps
    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    up_down: Option<UpDownFlow>,

    #[arg(long)]
    left_right: Option<LeftRightFlow>,

    /// off, standard, elderly or child
    #[arg(long)]
    sleep: Option<SleepMode>,

    /// Print the command bytes instead of sending them
    #[arg(long)]
    dry_run: bool,
}


#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let port = Port::open(&args.port).await?.framed();
    let mut session = Session::with_port(port)
        .with_response_timeout(Duration::from_millis(args.timeout_ms));

    match args.action {
        Action::Status => {
            let report = session.poll_state().await
                .with_context(|| format!("failed to poll state from {}", args.port))?;
            print_report(report);
        }

        Action::Watch { interval_ms } => {
            loop {
                match session.poll_state().await {
                    Ok(report) => {
                        print_report(report);
                        println!();
                    }
                    Err(err) => warn!("poll failed: {err}"),
                }

                sleep(Duration::from_millis(interval_ms)).await;
            }
        }

        Action::Set(set) => {
            session.poll_state().await
                .with_context(|| format!("failed to poll state from {}", args.port))?;

            stage_settings(&mut session, &set)?;

            if !session.has_pending_command() {
                bail!("nothing to set");
            }

            if set.dry_run {
                let bytes = session.command_bytes()?;
                println!("{}", format!("{bytes:02x?}").dimmed());
                return Ok(());
            }

            let report = session.apply_settings().await
                .context("failed to apply settings")?;
            print_report(report);
        }
    }

    Ok(())
}


fn stage_settings(session: &mut Session, set: &SetArgs) -> Result<()> {
    let flags: [(Option<bool>, fn(&mut Session, bool) -> Result<(), SessionError>); 6] = [
        (set.power, Session::set_power_on),
        (set.eco, Session::set_eco),
        (set.display, Session::set_display_on),
        (set.strong, Session::set_strong),
        (set.health, Session::set_health),
        (set.mute, Session::set_mute),
    ];

    for (value, setter) in flags {
        if let Some(value) = value {
            setter(session, value)?;
        }
    }

    if let Some(mode) = set.mode {
        session.set_mode(mode)?;
    }

    if let Some(fan) = set.fan {
        session.set_chosen_fan_speed(fan)?;
    }

    if let Some(temperature) = set.temperature {
        session.set_chosen_temperature(temperature)
            .with_context(|| format!("can't set temperature to {temperature}"))?;
    }

    if let Some(flow) = set.up_down {
        session.set_up_down_flow(flow)?;
    }

    if let Some(flow) = set.left_right {
        session.set_left_right_flow(flow)?;
    }

    if let Some(sleep) = set.sleep {
        session.set_sleep_mode(sleep)?;
    }

    Ok(())
}


fn on_off(value: bool) -> ColoredString {
    if value { "on".green() } else { "off".red() }
}

fn setting<T: Display>(value: Result<T, CodecError>) -> ColoredString {
    match value {
        Ok(value) => value.to_string().normal(),
        Err(err) => err.to_string().yellow(),
    }
}

fn print_report(report: &StateReport) {
    let line = |label: &str, value: ColoredString| {
        println!("{:>24}: {value}", label.bold());
    };

    line("power", on_off(report.power));
    line("mode", setting(report.mode()));
    line("set point", format!("{}C", report.set_point()).normal());
    line("fan", setting(report.fan_speed()));
    line("eco", on_off(report.eco));
    line("strong", on_off(report.strong));
    line("health", on_off(report.health));
    line("display", on_off(report.display));
    line("mute", on_off(report.mute));
    line("antifreeze", on_off(report.antifreeze));
    line("sleep", setting(report.sleep_mode()));
    line("up/down flow", setting(report.up_down_flow()));
    line("left/right flow", setting(report.left_right_flow()));
    line("vertical swing", on_off(report.vertical_flow));
    line("horizontal swing", on_off(report.horizontal_flow));

    line("indoor", format!("{:.1}C", report.indoor_temperature()).cyan());
    line("indoor heat exchanger", format!("{:.1}C", report.indoor_heat_exchanger_temperature()).cyan());
    line("outdoor", format!("{}C", report.outdoor_temperature()).cyan());
    line("condenser coil", format!("{}C", report.condenser_coil_temperature()).cyan());
    line("compressor discharge", format!("{}C", report.compressor_discharge_temperature()).cyan());
    line("compressor frequency", report.compressor_frequency.to_string().normal());
    line("indoor fan", setting(report.indoor_fan_speed()));
    line("outdoor fan", report.outdoor_fan_speed.to_string().normal());
    line("outdoor unit running", setting(report.outdoor_running()));
    line("heating", on_off(report.heat_mode));
    line("four-way valve", on_off(report.four_way_valve_on));
    line("supply voltage", format!("{}V", report.supply_voltage).normal());
    line("current", format!("{}A", report.current_used_amps).normal());
}
