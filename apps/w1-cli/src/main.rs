use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::thread;
use std::time::Duration;
use tracing::info;

use w1_therm::{TempUnit, W1Bus};

#[derive(Parser, Debug)]
#[command(
    name = "w1",
    version,
    about = "DS18B20 temperature readings over the 1-Wire bus",
    disable_help_subcommand = true
)]
struct Cli {
    /// Output unit for all readings
    #[arg(long, value_enum, default_value_t = Unit::Celsius, global = true)]
    unit: Unit,

    /// Override the w1 sysfs root (skips modprobe); for tests and bring-up
    #[arg(long, global = true)]
    root: Option<String>,

    /// Emit JSON lines instead of human-readable text
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Unit {
    Celsius,
    Fahrenheit,
}

impl Unit {
    fn into_core(self) -> TempUnit {
        match self {
            Unit::Celsius => TempUnit::Celsius,
            Unit::Fahrenheit => TempUnit::Fahrenheit,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List serial numbers of detected sensors
    List,
    /// Read all sensors once, or one sensor by serial
    Read {
        /// Serial number (e.g. 28-000004d5c1aa); omit to read all
        #[arg(long)]
        serial: Option<String>,
    },
    /// Poll all sensors in a loop
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 2u64)]
        interval_secs: u64,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let bus = open_bus(&cli);

    match cli.command {
        Commands::List => list(&bus, cli.json),
        Commands::Read { serial } => read(&bus, serial.as_deref(), cli.json),
        Commands::Watch { interval_secs } => watch(&bus, interval_secs, cli.json),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn open_bus(cli: &Cli) -> W1Bus {
    let unit = cli.unit.into_core();
    match &cli.root {
        Some(root) => W1Bus::with_root(root, unit),
        None => W1Bus::new(unit),
    }
}

fn list(bus: &W1Bus, json: bool) -> Result<()> {
    let serials = bus.list_sensors();
    info!(count = serials.len(), "sensors detected");
    if json {
        println!("{}", serde_json::to_string(&serials)?);
    } else {
        for sn in serials {
            println!("{sn}");
        }
    }
    Ok(())
}

fn read(bus: &W1Bus, serial: Option<&str>, json: bool) -> Result<()> {
    match serial {
        Some(sn) => match bus.read_by_serial(sn) {
            Some(value) => print_one(sn, value, json)?,
            None => bail!("no usable reading from {sn} (not attached, or read failed)"),
        },
        None => {
            for reading in bus.read_all() {
                if json {
                    println!("{}", serde_json::to_string(&reading)?);
                } else {
                    print_one(reading.serial.as_str(), reading.value, false)?;
                }
            }
        }
    }
    Ok(())
}

fn watch(bus: &W1Bus, interval_secs: u64, json: bool) -> Result<()> {
    loop {
        for reading in bus.read_all() {
            if json {
                println!("{}", serde_json::to_string(&reading)?);
            } else {
                print_one(reading.serial.as_str(), reading.value, false)?;
            }
        }
        thread::sleep(Duration::from_secs(interval_secs));
    }
}

fn print_one(serial: &str, value: f64, json: bool) -> Result<()> {
    if json {
        println!(r#"{{"serial":"{serial}","value":{value}}}"#);
    } else {
        // Rounding is presentation-only; the library never rounds.
        println!("SN: {serial}, Temp: {value:.1}");
    }
    Ok(())
}
