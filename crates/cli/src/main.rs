//! A small demo binary: boots a [`nn_runtime::Universe`], installs the
//! shipped [`nn_components`] peripherals onto one [`nn_runtime::Computer`],
//! and drives a trivial scripted [`nn_runtime::Architecture`] for a handful
//! of ticks so a reader can watch the lifecycle/signal/resource machinery
//! in §3-§5 of the spec actually move.
//!
//! This is a manual-exploration harness, not a BIOS loader: it has no
//! opinion about guest bytecode, and the "architecture" it drives just
//! invokes a couple of component methods and logs what came back.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context as _, Result};
use chrono::Local;
use clap::Parser;
use nn_components::{EepromHandler, GpuHandler, ScreenHandler};
use nn_core::{Context, NnResult, Value};
use nn_runtime::{Architecture, Computer, MethodTable, Universe};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nn-cli", about = "NeoNucleus emulator substrate: manual-exploration demo harness")]
struct Cli {
    /// Number of ticks to run before exiting.
    #[arg(long, default_value_t = 5)]
    ticks: u32,

    /// Address the demo EEPROM boots with pre-loaded "code".
    #[arg(long, default_value = "DEMO-BOOT")]
    boot_code: String,

    /// Optional file to additionally mirror logs to, alongside stderr.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

/// A trivial scripted architecture: on ARCH_INIT it installs an EEPROM,
/// GPU, and Screen; each ARCH_TICK it reads the EEPROM checksum, writes a
/// greeting to the screen through the GPU, and drains any pending signals,
/// logging each one. It never errors and never requests a state change, so
/// the Computer simply cycles RUNNING tick after tick.
struct DemoArchitecture {
    eeprom_table: Rc<MethodTable>,
    gpu_table: Rc<MethodTable>,
    screen_table: Rc<MethodTable>,
    ticks_run: u32,
}

impl DemoArchitecture {
    fn new(eeprom_table: Rc<MethodTable>, gpu_table: Rc<MethodTable>, screen_table: Rc<MethodTable>) -> Self {
        DemoArchitecture {
            eeprom_table,
            gpu_table,
            screen_table,
            ticks_run: 0,
        }
    }
}

impl Architecture for DemoArchitecture {
    fn name(&self) -> &str {
        "demo-scripted"
    }

    fn init(&mut self, computer: &mut Computer) -> NnResult<()> {
        computer.add_component(Rc::clone(&self.eeprom_table), "eeprom-0", -1)?;
        computer.add_component(Rc::clone(&self.screen_table), "screen-0", -1)?;
        computer.add_component(Rc::clone(&self.gpu_table), "gpu-0", -1)?;
        info!("architecture initialized, 3 components installed");
        Ok(())
    }

    fn tick(&mut self, computer: &mut Computer) -> NnResult<()> {
        self.ticks_run += 1;

        computer.invoke("eeprom-0", "getChecksum")?;
        let checksum = computer.frame().get_return(0);
        info!(tick = self.ticks_run, checksum = ?checksum.to_str(), "eeprom checksum read");

        if self.ticks_run == 1 {
            computer.frame_mut().add_argument(Value::string("screen-0"));
            computer.frame_mut().add_argument(Value::boolean(true));
            computer.invoke("gpu-0", "bind")?;
        }
        computer.frame_mut().add_argument(Value::int(1));
        computer.frame_mut().add_argument(Value::int(self.ticks_run as i64));
        computer.frame_mut().add_argument(Value::string(format!("tick {}", self.ticks_run)));
        computer.invoke("gpu-0", "set")?;

        while computer.signal_queue_len() > 0 {
            let values = computer.peek_signal().map(|v| v.to_vec()).unwrap_or_default();
            info!(tick = self.ticks_run, signal = ?values.first().and_then(|v| v.to_str()), "signal observed");
            computer.pop_signal()?;
        }

        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;

    let context = Context::single_threaded();
    let mut universe = Universe::new(context.clone());

    let eeprom_table = universe
        .register_component_type(MethodTable::new(Rc::new(
            EepromHandler::default().with_code(cli.boot_code.into_bytes(), "demo-eeprom"),
        )))
        .context("registering eeprom component type")?;
    let screen_table = universe
        .register_component_type(MethodTable::new(Rc::new(ScreenHandler::new(40, 16))))
        .context("registering screen component type")?;
    let gpu_table = universe
        .register_component_type(MethodTable::new(Rc::new(GpuHandler::default())))
        .context("registering gpu component type")?;

    let mut computer = Computer::new(context, 16, 1000.0, 30.0, 256.0, 1 << 20);
    computer.set_architecture(Box::new(DemoArchitecture::new(eeprom_table, gpu_table, screen_table)));

    info!(address = computer.address(), ticks = cli.ticks, "computer created");

    for _ in 0..cli.ticks {
        computer
            .tick()
            .with_context(|| format!("ticking computer {}", computer.address()))?;
    }

    info!(
        energy = computer.resources().energy(),
        temperature = computer.resources().temperature(),
        components = computer.component_count(),
        "demo run complete"
    );
    Ok(())
}

/// Builds the tracing subscriber, optionally mirroring output to
/// `log_file` via a non-blocking writer. The returned guard must be held
/// for the process lifetime or the background writer thread is dropped
/// and buffered lines are lost.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let path = if path.extension().is_some() {
                path.to_path_buf()
            } else {
                path.join(default_log_name())
            };
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating log directory {}", parent.display()))?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = builder.with_writer(writer).with_ansi(false).try_init();
            Ok(Some(guard))
        }
        None => {
            let _ = builder.try_init();
            Ok(None)
        }
    }
}

fn default_log_name() -> String {
    format!("nn-cli-{}.log", Local::now().format("%Y-%m-%d"))
}
