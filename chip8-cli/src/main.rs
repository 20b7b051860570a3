//! Entrypoint for CLI
mod conf;
mod error;

use std::{env, error::Error, fs, time::Instant};

use chip8_core::{prelude::*, IMPL_VERSION};
use log::{error, info, warn};

use self::{conf::RunConf, error::AppError};

static USAGE: &str = r#"
usage: chip8 CMD FILE [CONF]

commands:
    run     Run the target ROM file, optionally with a YAML config
    dis     Disassemble the target ROM into readable assembly

environment:
    RUST_LOG    log level, one of error, warn, info, debug, trace

examples:
    chip8 run maze.rom
    chip8 run breakout.rom breakout.yaml
    chip8 dis breakout.rom
"#;

/// Headless driver loop.
///
/// Each frame the keypad state is handed to the machine, a batch of
/// steps runs followed by one timer tick, and then the frame is paced
/// to real time. The display is printed when the run ends.
fn run_bytecode(filepath: &str, conf_path: Option<&str>) -> Result<(), AppError> {
    let conf = match conf_path {
        Some(conf_path) => RunConf::from_file(conf_path)?,
        None => RunConf::default(),
    };
    let keys = conf.key_state()?;

    info!("load rom: {filepath}");
    let bytecode = fs::read(filepath)?;

    let mut vm = Chip8Vm::new(conf.vm.clone());
    vm.load_bytecode(bytecode.as_slice())?;

    let mut clock = Clock::new(vm.config().frame_rate);
    let start = Instant::now();
    let mut result = Ok(());

    for frame_no in 0..conf.frames {
        if conf.throttle {
            clock.wait();
        }

        vm.set_input(keys);

        match vm.run_frame() {
            Ok(frame) => {
                for buzzer in &frame.buzzer {
                    match buzzer {
                        Buzzer::On => info!("frame {frame_no}: buzzer on"),
                        Buzzer::Off => info!("frame {frame_no}: buzzer off"),
                    }
                }
                if frame.redraw {
                    log::trace!("frame {frame_no}: redraw");
                }
                if frame.interrupted {
                    break;
                }
            }
            Err(err) => {
                error!("frame {frame_no}: {err}");
                result = Err(err);
                break;
            }
        }
    }

    if vm.cpu().is_waiting_key() {
        warn!("program is waiting for a keypress");
    }

    println!(
        "time taken: {}ms",
        start.elapsed().as_nanos() as f64 / 1000000.0
    ); // to millis
    println!("{}", vm.dump_display()?);

    result?;

    Ok(())
}

fn run_disassembler(filepath: &str) -> Result<(), AppError> {
    info!("disassemble rom: {filepath}");

    let bytecode = fs::read(filepath)?;
    Disassembler::new(bytecode.as_slice()).print_bytecode()?;

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    match parse_args() {
        Some(Cmd::Run { filepath, conf }) => run_bytecode(&filepath, conf.as_deref())?,
        Some(Cmd::Dis { filepath }) => run_disassembler(&filepath)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => {
            // don't format me T.T
            match cmd.as_str() {
                "run" => Some(Cmd::Run {
                    filepath: args.next()?,
                    conf: args.next(),
                }),
                "dis" => Some(Cmd::Dis {
                    filepath: args.next()?,
                }),
                _ => None,
            }
        }
        None => None,
    }
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        conf: Option<String>,
    },
    /// Disassemble
    Dis { filepath: String },
}
