//! Command-line interface for vimscan
//! This binary highlights a file (or stdin) with a syntax file and writes the result to stdout.
//!
//! Usage:
//!   vimscan `<syntax>` [`<input>`] [--format `<format>`] [--config `<file>`] [--set key=value]
//!   vimscan --list-modes                                   - List the highlight modes

use clap::{Arg, ArgAction, Command};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vimscan::highlighting::{
    HighlightMode, HtmlFormatter, PlainFormatter, RecordingFormatter, Scanner, SyntaxFile,
};
use vimscan_config::{Loader, OutputFormat, ScanConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let matches = Command::new("vimscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Highlights source text using Vim-style syntax definitions")
        .arg_required_else_help(true)
        .arg(
            Arg::new("syntax")
                .help("Path to the syntax file (.json, or YAML otherwise)")
                .required_unless_present("list-modes")
                .index(1),
        )
        .arg(
            Arg::new("input")
                .help("File to highlight (default: stdin)")
                .index(2),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format: html, plain or tokens (default from config: html)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file layered over the built-in defaults"),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .short('s')
                .help("Override a config value, e.g. reader.window_size=4096")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("line-numbers")
                .long("line-numbers")
                .short('n')
                .help("Number the lines of HTML output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-modes")
                .long("list-modes")
                .help("List the highlight modes and their CSS classes")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("list-modes") {
        handle_list_modes_command();
        return;
    }

    let config = load_config(
        matches.get_one::<String>("config").map(String::as_str),
        matches.get_many::<String>("set").into_iter().flatten(),
        matches.get_one::<String>("format").map(String::as_str),
        matches.get_flag("line-numbers"),
    );

    let Some(syntax) = matches.get_one::<String>("syntax") else {
        fail("a syntax file is required");
    };
    let input = matches.get_one::<String>("input").map(String::as_str);
    handle_scan_command(&config, syntax, input);
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn load_config<'a>(
    file: Option<&str>,
    overrides: impl Iterator<Item = &'a String>,
    format: Option<&str>,
    line_numbers: bool,
) -> ScanConfig {
    let mut loader = Loader::new();
    if let Some(path) = file {
        loader = loader.with_file(path);
    }

    let apply = |loader: Loader, key: &str, value: &str| {
        loader
            .set_override(key, value)
            .unwrap_or_else(|e| fail(format!("cannot apply '{}': {}", key, e)))
    };

    for setting in overrides {
        let Some((key, value)) = setting.split_once('=') else {
            fail(format!("'{}' is not of the form key=value", setting));
        };
        loader = apply(loader, key.trim(), value.trim());
    }
    if let Some(format) = format {
        loader = apply(loader, "output.format", format);
    }
    if line_numbers {
        loader = apply(loader, "output.line_numbers", "true");
    }

    loader
        .build()
        .unwrap_or_else(|e| fail(format!("invalid configuration: {}", e)))
}

/// Handle the scan command
fn handle_scan_command(config: &ScanConfig, syntax: &str, input: Option<&str>) {
    let definition = SyntaxFile::from_path(syntax)
        .and_then(|file| file.build())
        .unwrap_or_else(|e| fail(e));
    let definition = Arc::new(definition);
    let syntax_id = definition.id().to_string();
    let mut scanner = Scanner::with_options(definition, config.scan_options());

    let source: Box<dyn Read + Send> = match input {
        Some(path) => Box::new(
            File::open(path).unwrap_or_else(|e| fail(format!("cannot open {}: {}", path, e))),
        ),
        None => Box::new(io::stdin()),
    };

    let scanned = match config.output.format {
        OutputFormat::Html => {
            let mut formatter = HtmlFormatter::new(BufWriter::new(io::stdout()))
                .with_syntax_id(syntax_id)
                .with_line_numbers(config.output.line_numbers);
            scanner.scan(source, &mut formatter)
        }
        OutputFormat::Plain => {
            let mut formatter = PlainFormatter::new(BufWriter::new(io::stdout()));
            scanner.scan(source, &mut formatter)
        }
        OutputFormat::Tokens => {
            let mut formatter = RecordingFormatter::new();
            scanner
                .scan(source, &mut formatter)
                .map(|()| print_tokens(&formatter))
        }
    };

    if let Err(e) = scanned {
        fail(e);
    }
}

#[derive(Serialize)]
struct Token<'a> {
    start: usize,
    end: usize,
    mode: HighlightMode,
    text: &'a str,
}

fn print_tokens(formatter: &RecordingFormatter) {
    let text = formatter.text();
    let tokens: Vec<Token<'_>> = formatter
        .spans()
        .into_iter()
        .map(|span| Token {
            start: span.start,
            end: span.end,
            mode: span.mode,
            text: text.get(span.start..span.end).unwrap_or(""),
        })
        .collect();

    let json = serde_json::to_string_pretty(&tokens)
        .unwrap_or_else(|e| fail(format!("cannot format tokens: {}", e)));
    println!("{}", json);
}

/// Handle the list-modes command
fn handle_list_modes_command() {
    println!("Available highlight modes:\n");
    for mode in HighlightMode::ALL {
        println!("  {:<16} {}", mode.name(), mode.css_class());
    }
}
