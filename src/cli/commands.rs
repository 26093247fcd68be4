use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "scripture-ingest",
    version,
    about = "Extract verses from USFM books and HTML chapter files",
    after_help = "Output is JSON on stdout; logs go to stderr (RUST_LOG overrides -v/-q). \
                  Settings are read from scripture-ingest.toml in the working directory \
                  unless --config is given."
)]
pub struct Cli {
    /// Settings file (default: ./scripture-ingest.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output shaping shared by the parse commands.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct OutputArgs {
    /// Print counts, errors and the first verses instead of every verse
    #[arg(long)]
    pub summary: bool,
    /// Maximum number of verses to print
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a USFM book file or a directory of them.
    ///
    /// Without --pattern, a directory is searched for *.usfm, *.SFM, *.sfm
    /// and *.USFM files in that order (configurable), and the first pattern
    /// that matches anything is used.
    Usfm {
        /// File or directory
        path: String,
        /// File-name glob for directories
        #[arg(short, long)]
        pattern: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Parse an HTML chapter file (e.g. MAT01.htm) or a directory of them.
    ///
    /// Introduction files (chapter 00) and files not named {CODE}{CC}.htm are
    /// skipped in directories.
    Html {
        /// File or directory
        path: String,
        /// File-name glob for directories (default: *.htm)
        #[arg(short, long)]
        pattern: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Parse a file or directory, detecting the format from its contents
    Parse {
        /// File or directory
        path: String,
        /// Force a format: usfm or html
        #[arg(short, long)]
        format: Option<String>,
        /// File-name glob for directories
        #[arg(short, long)]
        pattern: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Remove USFM markers from a piece of verse text
    Strip {
        /// Text containing markers, e.g. '\w In|strong="G1722"\w*'
        text: String,
    },

    /// List the 66 book codes in canonical order
    Books,
}
