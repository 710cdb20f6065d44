// cinder - Command-line runner for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::rc::Rc;

use cinder_vm::serialize;
use cinder_vm::{Function, GasCosts, InterpretResult, InterpretStatus, Vm, VmConfig, compile};
use log::{Level, LevelFilter, Log, Metadata, Record};

const USAGE: &str =
    "Usage: cinder [--gas N] [--gas-costs FILE] [--disassemble] [--emit-bytecode OUT.json] [FILE]";

// Exit codes, following sysexits.h.
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;
const EX_IOERR: i32 = 74;
const EX_TEMPFAIL: i32 = 75;

fn main() {
    init_logger();

    let args: Vec<String> = env::args().skip(1).collect();

    // Handle --version flag
    if args.len() == 1 && (args[0] == "--version" || args[0] == "-v") {
        println!("Cinder v{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let options = match Options::parse(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            process::exit(EX_USAGE);
        }
    };

    let config = match options.vm_config() {
        Ok(config) => config,
        Err(fail) => fail.exit(),
    };

    match &options.file {
        Some(file) => {
            if let Err(fail) = run_file(file, &options, config) {
                fail.exit();
            }
        }
        None => run_repl(Vm::with_config(config), options.gas),
    }
}

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Default)]
struct Options {
    gas: Option<u64>,
    gas_costs: Option<String>,
    disassemble: bool,
    emit_bytecode: Option<String>,
    file: Option<String>,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut options = Options::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--gas" => {
                    let value = iter.next().ok_or("--gas needs a value")?;
                    let budget = value
                        .parse()
                        .map_err(|_| format!("invalid gas budget '{}'", value))?;
                    options.gas = Some(budget);
                }
                "--gas-costs" => {
                    let path = iter.next().ok_or("--gas-costs needs a file")?;
                    options.gas_costs = Some(path.clone());
                }
                "--disassemble" => options.disassemble = true,
                "--emit-bytecode" => {
                    let path = iter.next().ok_or("--emit-bytecode needs a file")?;
                    options.emit_bytecode = Some(path.clone());
                }
                flag if flag.starts_with("--") => {
                    return Err(format!("unknown option '{}'", flag));
                }
                file => {
                    if options.file.is_some() {
                        return Err("only one input file may be given".to_string());
                    }
                    options.file = Some(file.to_string());
                }
            }
        }
        if options.file.is_none() && (options.disassemble || options.emit_bytecode.is_some()) {
            return Err("--disassemble and --emit-bytecode need an input file".to_string());
        }
        Ok(options)
    }

    /// A budget without a cost table charges one unit per instruction.
    fn vm_config(&self) -> Result<VmConfig, Failure> {
        let gas_costs = match &self.gas_costs {
            Some(path) => {
                let text = read(path)?;
                let costs = GasCosts::from_json(&text)
                    .map_err(|e| Failure::new(EX_DATAERR, format!("{}: {}", path, e)))?;
                Some(costs)
            }
            None => self.gas.map(|_| GasCosts::uniform(1)),
        };
        Ok(VmConfig {
            gas_costs,
            ..VmConfig::default()
        })
    }
}

// ============================================================================
// Files
// ============================================================================

/// A message and the exit code it maps to.
struct Failure {
    code: i32,
    message: String,
}

impl Failure {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Failure {
            code,
            message: message.into(),
        }
    }

    fn exit(self) -> ! {
        if !self.message.is_empty() {
            eprintln!("{}", self.message);
        }
        process::exit(self.code);
    }
}

fn read(path: &str) -> Result<String, Failure> {
    fs::read_to_string(path)
        .map_err(|e| Failure::new(EX_IOERR, format!("Error reading '{}': {}", path, e)))
}

/// Compile source text, or load it as bytecode when the file ends in `.json`.
fn load(file: &str) -> Result<Function, Failure> {
    let text = read(file)?;
    let is_bytecode = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_bytecode {
        serialize::from_json(&text)
            .map_err(|e| Failure::new(EX_DATAERR, format!("Error loading '{}': {}", file, e)))
    } else {
        compile(&text).map_err(|errors| Failure::new(EX_DATAERR, errors.to_string()))
    }
}

/// Run a file. `--disassemble` and `--emit-bytecode` replace execution.
fn run_file(file: &str, options: &Options, config: VmConfig) -> Result<(), Failure> {
    let function = load(file)?;

    if options.disassemble || options.emit_bytecode.is_some() {
        if options.disassemble {
            print!("{}", function.disassemble());
        }
        if let Some(out) = &options.emit_bytecode {
            let json = serialize::to_json_pretty(&function)
                .map_err(|e| Failure::new(EX_DATAERR, e.to_string()))?;
            fs::write(out, json).map_err(|e| {
                Failure::new(EX_IOERR, format!("Error writing '{}': {}", out, e))
            })?;
        }
        return Ok(());
    }

    let mut vm = Vm::with_config(config);
    let result = vm.interpret_function(Rc::new(function), options.gas);
    report(&result);
    match result.status {
        InterpretStatus::Ok => Ok(()),
        InterpretStatus::CompileError => Err(Failure::new(EX_DATAERR, "")),
        InterpretStatus::RuntimeError => Err(Failure::new(EX_SOFTWARE, "")),
        InterpretStatus::OutOfGas => Err(Failure::new(EX_TEMPFAIL, "")),
    }
}

fn report(result: &InterpretResult) {
    for line in result.diagnostics() {
        eprintln!("{}", line);
    }
}

// ============================================================================
// REPL
// ============================================================================

/// Run the interactive REPL. Globals persist between lines.
fn run_repl(mut vm: Vm, gas: Option<u64>) {
    println!("Cinder v{}", env!("CARGO_PKG_VERSION"));

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                let result = vm.interpret(input, gas);
                report(&result);
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Writes log records to stderr.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let _ = writeln!(io::stderr(), "[{} {}] {}", tag, record.target(), record.args());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Install the stderr logger at the level named by `CINDER_LOG` (default `warn`).
fn init_logger() {
    let level = env::var("CINDER_LOG")
        .ok()
        .and_then(|name| name.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flags() {
        let options = Options::parse(&args(&["--gas", "100", "--disassemble", "main.cinder"])).unwrap();
        assert_eq!(options.gas, Some(100));
        assert!(options.disassemble);
        assert_eq!(options.file.as_deref(), Some("main.cinder"));
    }

    #[test]
    fn test_parse_rejects_bad_usage() {
        assert!(Options::parse(&args(&["--gas"])).is_err());
        assert!(Options::parse(&args(&["--gas", "lots"])).is_err());
        assert!(Options::parse(&args(&["--frobnicate"])).is_err());
        assert!(Options::parse(&args(&["a.cinder", "b.cinder"])).is_err());
        assert!(Options::parse(&args(&["--disassemble"])).is_err());
    }

    #[test]
    fn test_gas_budget_implies_uniform_costs() {
        let options = Options::parse(&args(&["--gas", "10"])).unwrap();
        let config = options.vm_config().ok().unwrap();
        assert_eq!(config.gas_costs, Some(GasCosts::uniform(1)));

        let options = Options::parse(&args(&[])).unwrap();
        assert!(options.vm_config().ok().unwrap().gas_costs.is_none());
    }
}
