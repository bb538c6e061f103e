use chrono::TimeDelta;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about)]
pub struct Arguments {
    #[arg(short = 'v', long = None, env = "STOPWATCH_VERBOSITY", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a stopwatch and drive it with commands read from standard input.
    Run(Run),
    /// Continue a stopwatch from a serialized elapsed time.
    Resume(Resume),
    /// Time a command.
    Exec(Exec),
}

#[derive(Debug, Parser)]
pub struct Run {
    #[arg(short, long, env = "STOPWATCH_LABEL", default_value = "stopwatch")]
    pub label: String,

    /// Initial elapsed time, e.g. "1m30s". Negative values count down.
    #[arg(
        short,
        long,
        env = "STOPWATCH_OFFSET",
        default_value = "0",
        allow_hyphen_values = true,
        value_parser = stopwatch::duration::parse
    )]
    pub offset: TimeDelta,
}

#[derive(Debug, Parser)]
pub struct Resume {
    #[arg(short, long, env = "STOPWATCH_LABEL", default_value = "stopwatch")]
    pub label: String,

    /// A duration such as "72h3m0.5s", or the same as a JSON string.
    #[arg(allow_hyphen_values = true)]
    pub elapsed: String,
}

#[derive(Debug, Parser)]
pub struct Exec {
    /// Defaults to the program name.
    #[arg(short, long, env = "STOPWATCH_LABEL")]
    pub label: Option<String>,

    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
