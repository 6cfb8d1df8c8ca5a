//! CLI argument parsing for the launcher

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gpudataperf")]
#[command(version)]
#[command(
    about = "GPU data-movement profiler: launches a program with capture enabled \
             and reports inefficient data transfers at exit",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output (echoes the capture environment)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress warnings from the capture runtime
    #[arg(short, long)]
    pub quiet: bool,

    /// Program to profile, followed by its arguments
    #[arg(
        value_name = "PROGRAM [ARGS]...",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}
