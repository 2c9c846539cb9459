// Hotrs Daemon
// Grabs physical keyboards, expands hotstrings, forwards everything else

#[cfg(feature = "pure-rust")]
use std::path::PathBuf;
#[cfg(feature = "pure-rust")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "pure-rust")]
use std::sync::Arc;

#[cfg(feature = "pure-rust")]
use anyhow::{Context, Result};
#[cfg(feature = "pure-rust")]
use clap::Parser;
#[cfg(feature = "pure-rust")]
use parking_lot::Mutex;

#[cfg(feature = "pure-rust")]
use hotrs_core::{
    Config, DeviceFilter, Engine, EventLoop, GrabHandle, Key, ModifierState, RuleSet, Transition,
    UsLayout, Verdict, VirtualDevice,
};

/// Poll timeout; bounds how long a stop request waits
#[cfg(feature = "pure-rust")]
const POLL_TIMEOUT_MS: i32 = 100;

/// Hotstring expander for Linux keyboards
#[cfg(feature = "pure-rust")]
#[derive(Parser, Debug)]
#[command(name = "hotrs")]
#[command(version)]
#[command(about = "Hotstring expander for Linux keyboards", long_about = None)]
struct Args {
    /// TOML configuration file (default: ~/.config/hotrs/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Manually specify devices to grab (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard devices
    #[arg(long)]
    list_devices: bool,

    /// Start with expansion paused
    #[arg(long)]
    paused: bool,
}

#[cfg(feature = "pure-rust")]
fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

#[cfg(feature = "pure-rust")]
fn init_logging(verbose: bool) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(verbose)))
        .init();
}

/// CLI --devices > config [devices].only > autodetect
#[cfg(feature = "pure-rust")]
fn resolve_device_filter(args: &Args, config: &Config) -> DeviceFilter {
    if !args.devices.is_empty() {
        DeviceFilter::new(args.devices.clone())
    } else {
        DeviceFilter::new(config.device_filter.clone())
    }
}

/// Alt chord flag for an event, counting the event's own edge
#[cfg(feature = "pure-rust")]
fn is_system_event(before: ModifierState, key: Key, transition: Transition) -> bool {
    before.after(key, transition).alt()
}

/// Main application state
#[cfg(feature = "pure-rust")]
struct Application {
    config: Config,
    config_path: PathBuf,
    args: Args,
    /// Cleared to stop the main loop
    running: Arc<AtomicBool>,
}

#[cfg(feature = "pure-rust")]
impl Application {
    fn new(config_path: PathBuf, args: Args) -> Result<Self> {
        let config = Config::from_toml_path(&config_path)
            .with_context(|| format!("loading config {}", config_path.display()))?;

        Ok(Self {
            config,
            config_path,
            args,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    fn validate(&self) -> Result<()> {
        println!(
            "Configuration is valid: {} hotstring(s)",
            self.config.hotstrings.len()
        );
        Ok(())
    }

    fn list_devices() -> Result<()> {
        let devices = EventLoop::list_devices().context("finding keyboard devices")?;
        println!("Found {} keyboard device(s):", devices.len());
        for device in &devices {
            match &device.path {
                Some(path) => println!("  {}: {} ({})", device.index, device.name, path),
                None => println!("  {}: {}", device.index, device.name),
            }
        }
        Ok(())
    }

    /// Stop on SIGINT/SIGTERM; reload rules on SIGHUP
    fn spawn_signal_thread(&self, rules: RuleSet) -> Result<()> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals =
            Signals::new([SIGINT, SIGTERM, SIGHUP]).context("installing signal handlers")?;
        let running = Arc::clone(&self.running);
        let config_path = self.config_path.clone();

        std::thread::spawn(move || {
            for signal in &mut signals {
                match signal {
                    SIGHUP => match Config::from_toml_path(&config_path) {
                        Ok(config) => {
                            let ids = rules.replace_all(config.rules());
                            log::info!("reloaded {} hotstring(s)", ids.len());
                        }
                        Err(e) => log::warn!("config reload failed, keeping rules: {}", e),
                    },
                    _ => {
                        log::info!("received signal {}, shutting down", signal);
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        });
        Ok(())
    }

    fn run(&self) -> Result<()> {
        let config = &self.config;
        let rules = RuleSet::from_rules(config.rules());
        log::info!("loaded {} hotstring(s)", rules.len());

        let mut output_device = VirtualDevice::new().context("creating uinput device")?;
        output_device.set_throttle_delays(
            config.key_pre_delay_ms.unwrap_or(0),
            config.key_post_delay_ms.unwrap_or(0),
        );
        let output_device = Arc::new(Mutex::new(output_device));

        let filter = resolve_device_filter(&self.args, config);
        let event_loop = EventLoop::new_with_grab(&filter)
            .context("grabbing keyboard devices")?
            .into_shared();
        log::info!("grabbed: {:?}", event_loop.lock().device_names());

        let engine = Engine::new(
            rules.clone(),
            Box::new(UsLayout::new()),
            Box::new(Arc::clone(&output_device)),
        );
        engine.set_paused(self.args.paused || config.paused);
        let caps_lock = event_loop.lock().caps_lock_engaged();
        engine.set_caps_lock(caps_lock);
        engine.attach(Box::new(GrabHandle::new(Arc::clone(&event_loop))));

        self.spawn_signal_thread(rules)?;

        log::info!("hotrs is running. Press Ctrl+C to exit.");
        let result = self.run_main_loop(&event_loop, &engine, &output_device);

        engine.shutdown();
        if let Err(e) = output_device.lock().release_all() {
            log::warn!("releasing held keys failed: {}", e);
        }
        result
    }

    fn run_main_loop(
        &self,
        event_loop: &Mutex<EventLoop>,
        engine: &Engine,
        output_device: &Mutex<VirtualDevice>,
    ) -> Result<()> {
        let pause_key = self.config.pause_key;
        let emergency_eject_key = self.config.emergency_eject_key;

        while self.running.load(Ordering::SeqCst) {
            let inputs = event_loop
                .lock()
                .poll_keys(POLL_TIMEOUT_MS)
                .context("reading keyboard events")?;

            for input in inputs {
                let key: Key = input.key;

                if Some(key) == emergency_eject_key && input.transition.is_initial_press() {
                    log::warn!("emergency eject key pressed, stopping");
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }

                // The pause key is ours; neither edge reaches the application
                if Some(key) == pause_key {
                    if input.transition.is_initial_press() {
                        let paused = engine.toggle_paused();
                        log::info!("expansion {}", if paused { "paused" } else { "resumed" });
                    }
                    continue;
                }

                let is_system = is_system_event(engine.modifier_state(), key, input.transition);
                let verdict = engine.process_event(key, input.transition, is_system);
                log::trace!(
                    "{}: {} {} -> {:?}",
                    input.device_name,
                    key,
                    input.transition,
                    verdict
                );

                if verdict == Verdict::PassThrough {
                    if let Err(e) = output_device.lock().forward(key, input.transition) {
                        log::warn!("forwarding {} failed: {}", key, e);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(feature = "pure-rust")]
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Handle list-devices flag (doesn't require config)
    if args.list_devices {
        return Application::list_devices();
    }

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => Config::default_path().context("no config directory; pass --config")?,
    };

    let app = Application::new(config_path, args)?;

    if app.args.check_config {
        return app.validate();
    }

    app.run()
}

// Stub for when pure-rust feature is not enabled
#[cfg(not(feature = "pure-rust"))]
fn main() {
    eprintln!("Error: hotrs binary requires the 'pure-rust' feature to be enabled.");
    eprintln!("Please build with: cargo build --release --features pure-rust --bin hotrs");
    std::process::exit(1);
}
