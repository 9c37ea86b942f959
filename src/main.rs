use anyhow::Context;
use clap::Parser;
use log::info;
use vip8::{Machine, TimerMode};

mod app;
mod beep;
mod keymap;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// ROM file to load
    #[clap(value_parser)]
    filename: String,

    /// Instructions executed per second
    #[clap(long, value_parser, default_value_t = 540)]
    speed: u32,

    /// Size of each chip-8 pixel on screen
    #[clap(long, value_parser, default_value_t = 10)]
    zoom: usize,

    /// Tick the timers once per instruction instead of at 60Hz
    #[clap(long, value_parser)]
    coupled_timers: bool,

    /// Seed for the random number generator
    #[clap(long, value_parser)]
    seed: Option<u64>,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // parse command-line arguments
    let cli = Cli::parse();

    // read the rom; it is kept around so the machine can be reset
    let rom = std::fs::read(&cli.filename)
        .with_context(|| format!("error opening rom file: {}", &cli.filename))?;

    // build the machine and load the rom
    let mut machine = match cli.seed {
        Some(seed) => Machine::with_seed(seed),
        None => Machine::new(),
    };
    if !cli.coupled_timers {
        machine.set_timer_mode(TimerMode::External);
    }
    machine.load_program(&rom).context("error loading rom")?;
    info!("Running {} at {} instructions/s", &cli.filename, cli.speed);

    let settings = app::Settings {
        speed: cli.speed.max(1),
        zoom: cli.zoom.max(1),
    };

    // run
    app::run(machine, &rom, settings)?;
    Ok(())
}
