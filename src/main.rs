mod cli;

use crate::cli::{Arguments, Commands, Exec};
use anyhow::{anyhow, Context};
use chrono::TimeDelta;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::process::Command;
use stopwatch::{Clock, FormattedDuration, Stopwatch};
use tracing_log::LogTracer;

fn main() {
    let arguments = Arguments::parse();
    set_log_level(&arguments).expect("Failed to configure logging");

    tracing::debug!(?arguments, "starting stopwatch");

    match run(arguments) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(%e, "Unable to run the stopwatch");
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn set_log_level(arguments: &Arguments) -> anyhow::Result<()> {
    LogTracer::init()?;

    let level = match arguments.verbosity {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // Standard output carries the stopwatch readings.
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn run(arguments: Arguments) -> anyhow::Result<i32> {
    match arguments.command {
        Commands::Run(run) => {
            let mut stopwatch = Stopwatch::start_new(run.offset);
            interact(&mut stopwatch, &run.label, io::stdin().lock(), io::stdout().lock())?;
            Ok(0)
        }
        Commands::Resume(resume) => {
            let mut stopwatch = decode(&resume.elapsed)?;
            interact(&mut stopwatch, &resume.label, io::stdin().lock(), io::stdout().lock())?;
            Ok(0)
        }
        Commands::Exec(exec) => time_command(exec),
    }
}

fn decode(elapsed: &str) -> anyhow::Result<Stopwatch> {
    let stopwatch = if elapsed.trim_start().starts_with('"') {
        serde_json::from_str::<Stopwatch>(elapsed)
            .with_context(|| format!("Failed to decode the JSON elapsed time {elapsed}"))?
    } else {
        elapsed
            .parse::<Stopwatch>()
            .with_context(|| format!("Failed to decode the elapsed time {elapsed:?}"))?
    };

    Ok(stopwatch)
}

fn interact<C, R, W>(
    stopwatch: &mut Stopwatch<C>,
    label: &str,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    C: Clock,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line?;

        match line.trim() {
            "" => {}
            "start" => stopwatch.start(TimeDelta::zero()),
            "stop" => stopwatch.stop(),
            "reset" => stopwatch.reset(),
            "lap" => {
                let count = stopwatch.laps().len();
                let lap = stopwatch.lap();

                if stopwatch.laps().len() == count {
                    tracing::warn!("The stopwatch is not running, ignoring the lap");
                } else {
                    writeln!(output, "lap {}: {}", count + 1, FormattedDuration(lap))?;
                }
            }
            "laps" => {
                for (index, lap) in stopwatch.laps().iter().enumerate() {
                    writeln!(output, "lap {}: {}", index + 1, FormattedDuration(*lap))?;
                }
            }
            "show" => writeln!(output, "{stopwatch}")?,
            "json" => writeln!(output, "{}", serde_json::to_string(&*stopwatch)?)?,
            "quit" | "exit" => break,
            command => tracing::warn!(command, "Unknown command"),
        }
    }

    stopwatch.write_report(&mut output, label)?;
    stopwatch.log(label);

    Ok(())
}

fn time_command(exec: Exec) -> anyhow::Result<i32> {
    let (program, args) = exec
        .command
        .split_first()
        .ok_or_else(|| anyhow!("No command to run"))?;
    let label = exec.label.as_deref().unwrap_or(program);

    let mut stopwatch = Stopwatch::start_new(TimeDelta::zero());
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run {program}"))?;
    stopwatch.stop();

    tracing::debug!(%status, "command finished");

    stopwatch.print(label);
    stopwatch.log(label);

    // Killed by a signal.
    Ok(status.code().unwrap_or(1))
}
