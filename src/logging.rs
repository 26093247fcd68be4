use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default log level for the `-v`/`-q` flags.
#[must_use]
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Initialize tracing to stderr (stdout carries the JSON output).
/// `RUST_LOG` directives refine the default level.
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbose, quiet).into())
        .from_env_lossy();
    // A second init (tests, embedding) keeps the existing subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
