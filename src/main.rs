//! Binary entrypoint for touch-dimmer.

use std::process;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::info;
use tracing_subscriber::EnvFilter;

use touch_dimmer::cli::Cli;
use touch_dimmer::clock::SystemClock;
use touch_dimmer::daemon::{Daemon, Exit};
use touch_dimmer::platform::backlight::{BrightnessSink, SysfsBacklight};
use touch_dimmer::platform::input::InputWatcher;
use touch_dimmer::power::PowerStateMachine;
use touch_dimmer::slideshow::{CommandLauncher, SlideshowSupervisor};

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            println!("{err}");
            process::exit(1);
        }
    };
    init_tracing(&cli.log_level)?;

    let mut config = match cli.into_config() {
        Ok(config) => config,
        Err(err) => {
            println!("{err}");
            println!("{}", Cli::command().render_usage());
            process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        slide_timeout = ?config.slide_timeout,
        dim_timeout = ?config.dim_timeout,
        min_brightness = config.min_brightness,
        blank = %config
            .blank_window
            .map_or_else(|| "disabled".to_string(), |window| window.to_string()),
        slideshow = %config.slideshow,
        "touch-dimmer starting"
    );

    let mut backlight = SysfsBacklight::open(&config.backlight_dir)
        .with_context(|| format!("failed to open backlight {}", config.backlight_dir.display()))?;
    config.fit_to_hardware(backlight.max_brightness())?;
    let current = backlight.brightness().context("failed to read current brightness")?;
    info!(
        dir = %backlight.dir().display(),
        current,
        max = backlight.max_brightness(),
        "backlight ready"
    );

    let watcher = InputWatcher::open(&config.devices).context("failed to open input devices")?;

    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
    }

    let tick_interval = config.tick_interval;
    let supervisor = SlideshowSupervisor::new(CommandLauncher, config.slideshow.clone());
    let machine = PowerStateMachine::new(config, backlight, supervisor, SystemClock)?;
    let mut daemon = Daemon::new(watcher, machine, SystemClock, tick_interval, stop);

    match daemon.run()? {
        Exit::Shutdown => {
            info!("touch-dimmer stopped");
            Ok(())
        }
        Exit::Fatal => bail!("{}", Exit::Fatal),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .parse(level)
        .with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
