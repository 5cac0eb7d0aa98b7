//! Command-line interface of the `bandsym` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::io::format::bandsym_output;

const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Logs a nicely formatted BandSym heading to the `bandsym-output` logger.
pub fn log_heading() {
    let version = if let Some(ver) = VERSION {
        format!("v{ver}")
    } else {
        "v unknown".to_string()
    };
    bandsym_output!("╭──────────────────────────────────────────────────────────────╮");
    bandsym_output!("│                                                              │");
    bandsym_output!("│   ╔╗ ╔═╗╔╗╔╔╦╗╔═╗╦ ╦╔╦╗                                      │");
    bandsym_output!("│   ╠╩╗╠═╣║║║ ║║╚═╗╚╦╝║║║                                      │");
    bandsym_output!("│   ╚═╝╩ ╩╝╚╝═╩╝╚═╝ ╩ ╩ ╩                                      │");
    bandsym_output!("│                                                              │");
    bandsym_output!("│   symmetry and topology of plane-wave band structures        │");
    bandsym_output!("│                                                 {version:>12} │");
    bandsym_output!("╰──────────────────────────────────────────────────────────────╯");
    bandsym_output!("");
}

/// The command-line arguments of the `bandsym` binary.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Path to the YAML input file controlling the calculation.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Base name of the output files. The main output goes to
    /// `<output>.out`; the analysis results are serialised next to it.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Turns on debug logging.
    #[arg(short, long)]
    pub debug: bool,
}
