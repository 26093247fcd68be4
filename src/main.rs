// Inherit lint configuration from lib.rs for consistency
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value
)]

use std::path::Path;

use clap::Parser;

use scripture_ingest::cli::commands::{Cli, Command, OutputArgs};
use scripture_ingest::cli::output::{self, BookList, StripOutput, Summary, SUMMARY_VERSES};
use scripture_ingest::config::Config;
use scripture_ingest::ingest::book_codes::BOOKS;
use scripture_ingest::ingest::{markers, Dispatcher};
use scripture_ingest::logging;
use scripture_ingest::models::ParseResult;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}", output::format_error(&e));
            std::process::exit(1);
        }
    }
}

/// Run one command. `Ok(false)` means the output was printed but the parse
/// did not succeed.
fn run(cli: Cli) -> Result<bool, Box<dyn std::fmt::Display>> {
    let config = get_config(cli.config.as_deref())?;
    match cli.command {
        Command::Usfm {
            path,
            pattern,
            output,
        } => cmd_parse(&config, &path, Some("usfm"), pattern.as_deref(), output),
        Command::Html {
            path,
            pattern,
            output,
        } => cmd_parse(&config, &path, Some("html"), pattern.as_deref(), output),
        Command::Parse {
            path,
            format,
            pattern,
            output,
        } => cmd_parse(
            &config,
            &path,
            format.as_deref(),
            pattern.as_deref(),
            output,
        ),
        Command::Strip { text } => cmd_strip(&config, &text),
        Command::Books => cmd_books(&config),
    }
}

type CmdResult = Result<bool, Box<dyn std::fmt::Display>>;

fn map_err(e: impl std::fmt::Display + 'static) -> Box<dyn std::fmt::Display> {
    Box::new(e.to_string())
}

fn get_config(path: Option<&str>) -> Result<Config, Box<dyn std::fmt::Display>> {
    match path {
        Some(p) => Config::from_file(p).map_err(map_err),
        None => Config::from_cwd().map_err(map_err),
    }
}

fn cmd_parse(
    config: &Config,
    path: &str,
    format: Option<&str>,
    pattern: Option<&str>,
    args: OutputArgs,
) -> CmdResult {
    let dispatcher = Dispatcher::with_settings(&config.settings);
    let mut result = match dispatcher.parse(Path::new(path), format, pattern) {
        Ok(result) => result,
        // Missing paths are reported like any other parse failure.
        Err(e @ scripture_ingest::error::IngestError::FileNotFound { .. }) => {
            ParseResult::failed(e)
        }
        Err(e) => return Err(map_err(e)),
    };
    let success = result.success();

    if args.summary {
        let shown = args.limit.unwrap_or(SUMMARY_VERSES);
        let summary = Summary::from_result(&result, shown, config.settings.output.preview_chars);
        println!("{}", output::format_output(&summary, config.pretty_output()));
    } else {
        output::apply_limit(&mut result, args.limit);
        println!("{}", output::format_output(&result, config.pretty_output()));
    }
    Ok(success)
}

fn cmd_strip(config: &Config, text: &str) -> CmdResult {
    let stripped = StripOutput::from(markers::strip_markers_checked(text));
    let ok = !stripped.degraded;
    println!("{}", output::format_output(&stripped, config.pretty_output()));
    Ok(ok)
}

fn cmd_books(config: &Config) -> CmdResult {
    let list = BookList::new(&BOOKS);
    println!("{}", output::format_output(&list, config.pretty_output()));
    Ok(true)
}
