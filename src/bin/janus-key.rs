// Janus Key CLI
// Grabs a keyboard and re-emits it through a virtual device with dual-function keys

use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use signal_hook::consts::{SIGINT, SIGTERM};

use janus_core::{
    default_config_content, find_keyboard, list_keyboards, Config, Dispatcher, EventLoop,
    EvdevSource, VirtualDevice,
};

/// Dual-function keys for Linux evdev keyboards
#[derive(Parser, Debug)]
#[command(name = "janus-key")]
#[command(version)]
#[command(about = "Tap a key for itself, hold it for another", long_about = None)]
struct Args {
    /// Keyboard device to grab (e.g. /dev/input/event3); autodetected when omitted
    #[arg(value_name = "DEVICE")]
    device: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Hold threshold in milliseconds, overrides the config file
    #[arg(short, long, value_name = "MS")]
    threshold: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard devices
    #[arg(long)]
    list_devices: bool,

    /// Print a commented default config and exit
    #[arg(long)]
    print_default_config: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // RUST_LOG, when set, wins over the flag.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_toml_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load default config")?,
    };
    apply_overrides(&mut config, args)?;
    Ok(config)
}

/// Command-line values take precedence over the config file
fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(ms) = args.threshold {
        config
            .set_hold_threshold_ms(ms)
            .context("Invalid --threshold")?;
    }
    if let Some(device) = &args.device {
        config.device_path = Some(device.clone());
    }
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    let table = config.mapping_table().context("Invalid key table")?;
    println!("Configuration is valid");
    println!("  hold threshold: {} ms", config.hold_threshold.as_millis());
    for entry in table.entries() {
        match entry.secondary {
            Some(secondary) => println!(
                "  {}: tap {}, hold {}",
                entry.physical,
                entry.primary_function(),
                secondary
            ),
            None => println!("  {} -> {}", entry.physical, entry.primary_function()),
        }
    }
    Ok(())
}

fn list_devices() -> Result<()> {
    let keyboards = list_keyboards(VirtualDevice::DEFAULT_NAME);
    if keyboards.is_empty() {
        bail!("No keyboard devices found");
    }
    println!("Found {} keyboard device(s):", keyboards.len());
    for keyboard in &keyboards {
        println!("  {}: {}", keyboard.path.display(), keyboard.name);
    }
    Ok(())
}

fn run(config: Config) -> Result<()> {
    let table = config.mapping_table().context("Invalid key table")?;

    let stop = Arc::new(AtomicBool::new(false));
    let (wake_read, wake_write) =
        UnixStream::pair().context("Failed to create signal wake-up socket")?;
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .context("Failed to install signal handler")?;
        let writer = wake_write
            .try_clone()
            .context("Failed to clone signal wake-up socket")?;
        signal_hook::low_level::pipe::register(signal, writer)
            .context("Failed to install signal wake-up")?;
    }

    // Let the key that launched us come back up before grabbing.
    std::thread::sleep(config.startup_delay);

    let device_path = match &config.device_path {
        Some(path) => path.clone(),
        None => {
            let keyboard = find_keyboard(&config.virtual_name).context("Keyboard autodetection failed")?;
            log::info!("Autodetected keyboard: {} ({})", keyboard.name, keyboard.path.display());
            keyboard.path
        }
    };

    let mut source = EvdevSource::open(&device_path)?
        .with_wakeup(wake_read)
        .context("Failed to attach signal wake-up")?;

    let mut keys = source.supported_keys();
    keys.extend(table.output_keys());
    let output = VirtualDevice::new(&config.virtual_name, keys)?;

    source
        .grab()
        .with_context(|| format!("Failed to grab {}", device_path.display()))?;

    let dispatcher = Dispatcher::new(table, config.hold_threshold);
    let mut event_loop = EventLoop::new(source, output, dispatcher)
        .with_eject_key(config.emergency_eject_key)
        .with_stop_flag(stop);

    log::info!("janus-key is running. Press Ctrl+C to exit.");
    let result = event_loop.run();

    if let Err(e) = event_loop.shutdown() {
        log::warn!("Failed to release held keys: {}", e);
    }
    let (source, mut output, _) = event_loop.into_parts();
    drop(source);
    output.close().context("Failed to close virtual device")?;

    result.context("Event loop failed")
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.print_default_config {
        print!("{}", default_config_content());
        return Ok(());
    }

    if args.list_devices {
        return list_devices();
    }

    let config = load_config(&args)?;

    if args.check_config {
        return check_config(&config);
    }

    run(config)
}
