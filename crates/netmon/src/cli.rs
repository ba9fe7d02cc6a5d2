//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netmon")]
#[command(version, about = "Periodic system and network metrics logger with rotating log files")]
pub struct Cli {
    /// Config file (.toml, .yaml, .yml or .json)
    #[arg(short, long, env = "NETMON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the log file and its backups
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Seconds between collection cycles
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Seconds to wait before the first collection cycle
    #[arg(long)]
    pub initial_delay: Option<u64>,

    /// Run a single collection cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Increase verbosity of internal diagnostics (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
