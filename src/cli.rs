//! Command-line arguments for the `eyegrid` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use eyegrid::PaperSize;

#[derive(Parser)]
#[command(
    name = "eyegrid",
    version,
    about = "Lay out left and right eye images on a printable sheet",
    long_about = "Lay out left and right eye images on a printable two-column sheet.\n\n\
                  Commands are read one per line from stdin, or from --script.\n\
                  Type `help` at the prompt for the command list."
)]
pub struct Cli {
    /// Paper preset for the sheet.
    #[arg(long, value_enum, default_value = "a4")]
    pub paper: PaperArg,

    /// Export resolution. Clamped to 72..=1200; unparseable input means 300.
    #[arg(long, value_name = "N", default_value = "300")]
    pub dpi: String,

    /// Directory exported PNGs are written to.
    #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Program that receives the print PDF on stdin.
    #[arg(long = "print-command", value_name = "CMD", default_value = "lp")]
    pub print_command: PathBuf,

    /// PNG to upload to the left side before the first command. Repeatable.
    #[arg(long, value_name = "FILE")]
    pub left: Vec<PathBuf>,

    /// PNG to upload to the right side before the first command. Repeatable.
    #[arg(long, value_name = "FILE")]
    pub right: Vec<PathBuf>,

    /// Read commands from a file instead of stdin.
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q to silence).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaperArg {
    A4,
    A5,
}

impl From<PaperArg> for PaperSize {
    fn from(value: PaperArg) -> Self {
        match value {
            PaperArg::A4 => PaperSize::A4,
            PaperArg::A5 => PaperSize::A5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
