use std::fs;
use std::io::{self, Read, Write};

use clap::{Args, Parser, Subcommand, ValueEnum};

use bfvm::Interpreter;

#[derive(Parser, Debug)]
#[command(name = "bfvm", author, about, version)]
struct Cli {
    /// Logging verbosity, written to stderr
    #[arg(value_enum, short, long, default_value_t = LogLevel::Warn)]
    verbosity: LogLevel,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the generated Brainfuck program to stdout (the default)
    Emit,
    /// Generate the machine and execute a user program on it directly
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Read the user program from PATH instead of stdin
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Do not append the four-null terminator to the user program
    #[arg(long)]
    raw: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logging must stay off stdout: the emitted program owns it.
    let level: log::Level = cli.verbosity.clone().into();
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(level.to_level_filter())
        .init()
    {
        eprintln!("bfvm: failed to initialize logging: {e}");
    }

    let code = match cli.command {
        None | Some(Command::Emit) => emit(),
        Some(Command::Run(args)) => run(args),
    };

    std::process::exit(code);
}

/// Print the generated program: nothing but the eight commands on stdout.
fn emit() -> i32 {
    match bfvm::generate() {
        Ok(program) => {
            print!("{program}");
            let _ = io::stdout().flush();
            0
        }
        Err(e) => {
            eprintln!("bfvm: {e}");
            let _ = io::stderr().flush();
            1
        }
    }
}

fn run(args: RunArgs) -> i32 {
    let mut input: Vec<u8> = match args.file {
        Some(path) => match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("bfvm: failed to read program file: {e}");
                return 1;
            }
        },
        None => {
            let mut buf = Vec::new();
            if let Err(e) = io::stdin().lock().read_to_end(&mut buf) {
                eprintln!("bfvm: failed reading stdin: {e}");
                return 1;
            }
            buf
        }
    };
    if !args.raw {
        input.extend_from_slice(&[0, 0, 0, 0]);
    }

    let machine = match bfvm::generate() {
        Ok(program) => program,
        Err(e) => {
            eprintln!("bfvm: {e}");
            return 1;
        }
    };

    let mut host = match Interpreter::new(&machine, input.as_slice(), io::stdout()) {
        Ok(host) => host,
        Err(e) => {
            eprintln!("bfvm: {e}");
            return 1;
        }
    };
    match host.run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("bfvm: machine error: {e}");
            1
        }
    }
}
