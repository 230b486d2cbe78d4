use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::{Args, Subcommand};
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::{Config, DiagnosticsPolicy, Lox, RunResult, WriterSink};

/// sysexits EX_DATAERR: the program was rejected before running.
const EXIT_STATIC_ERROR: i32 = 65;

/// sysexits EX_SOFTWARE: the program failed while running.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print tokens as JSON objects, one per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input as a program and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Runs input as a Lox program
    Run {
        filename: Option<PathBuf>,

        #[command(flatten)]
        options: SessionOptions,
    },

    /// Reads and runs one line at a time against a persistent session
    Repl {
        #[command(flatten)]
        options: SessionOptions,
    },
}

#[derive(Args, Debug)]
struct SessionOptions {
    /// JSON file with session configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where diagnostics go besides the exit status
    #[arg(long, value_enum)]
    diagnostics: Option<DiagnosticsPolicy>,

    /// Deepest allowed nesting of function calls
    #[arg(long)]
    max_call_depth: Option<usize>,

    /// Report the run result as JSON on stderr
    #[arg(long)]
    json: bool,
}

impl SessionOptions {
    /// Configuration file first, then flags on top.
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {:?}", path))?;
                Config::from_json(&text).with_context(|| format!("Invalid config {:?}", path))?
            }
            None => Config::default(),
        };

        if let Some(diagnostics) = self.diagnostics {
            config.diagnostics = diagnostics;
        }
        if let Some(depth) = self.max_call_depth {
            config.max_call_depth = depth;
        }

        debug!("Session config: {:?}", config);
        Ok(config)
    }

    /// Output streams to stdout and is not kept for `out()`.
    fn session(&self) -> Result<Lox> {
        let config = Config {
            keep_transcript: false,
            ..self.config()?
        };

        Ok(Lox::new()
            .with_config(config)
            .with_sink(Box::new(WriterSink(io::stdout()))))
    }
}

/// Reads a source file through a memory map, or all of stdin when no file is given.
fn read_source(filename: Option<&Path>) -> Result<String> {
    let Some(filename) = filename else {
        info!("Reading source from stdin");
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        return Ok(source);
    };

    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read once, copied out and dropped before returning.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", filename))?;
    let source = std::str::from_utf8(&map)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), filename);
    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Human diagnostics unless the session already echoed them to stdout.
fn report(result: &RunResult, config: &Config, json: bool) -> Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string(result).context("Failed to encode result")?);
    } else if config.diagnostics == DiagnosticsPolicy::Structured {
        for diagnostic in result.diagnostics() {
            eprintln!("{}", diagnostic);
        }
    }
    Ok(())
}

fn tokenize(filename: Option<&Path>, json: bool) -> Result<()> {
    let source = read_source(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) if json => {
                println!("{}", serde_json::to_string(&token).context("Failed to encode token")?);
            }
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        std::process::exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: Option<&Path>) -> Result<()> {
    let source = read_source(filename)?;
    let mut parser = Parser::new(Scanner::new(&source));

    match parser.parse() {
        Ok(statements) => {
            let ast = AstPrinter::print_program(&statements);
            debug!("AST: {}", ast);
            println!("{}", ast);
        }
        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            std::process::exit(EXIT_STATIC_ERROR);
        }
    }

    info!("Parse subcommand completed");
    Ok(())
}

fn run(filename: Option<&Path>, options: &SessionOptions) -> Result<()> {
    let source = read_source(filename)?;
    let mut lox = options.session()?;

    let result = lox.interpret(&source);
    report(&result, lox.config(), options.json)?;

    match result {
        RunResult::Success => {
            info!("Program executed successfully");
            Ok(())
        }
        RunResult::SyntaxErrors(_) => std::process::exit(EXIT_STATIC_ERROR),
        RunResult::RuntimeError(_) => std::process::exit(EXIT_RUNTIME_ERROR),
    }
}

fn repl(options: &SessionOptions) -> Result<()> {
    let mut lox = options.session()?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("Failed to read line")? == 0 {
            break;
        }

        match line.trim() {
            ":quit" => break,
            ":reset" => {
                lox.reset();
                continue;
            }
            _ => {}
        }

        let result = lox.interpret(&line);
        report(&result, lox.config(), options.json)?;
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename.as_deref(), *json),
        Commands::Parse { filename } => parse(filename.as_deref()),
        Commands::Run { filename, options } => run(filename.as_deref(), options),
        Commands::Repl { options } => repl(options),
    }
}
