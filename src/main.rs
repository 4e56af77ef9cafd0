mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use zyppkit::{DebugLog, FailureReport, ReconcileOptions, Reconciler, RunReport};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let state = cli.state.desired();
    let options = ReconcileOptions {
        disable_gpg_check: cli.disable_gpg_check,
        disable_recommends: !cli.install_recommends,
        check_mode: cli.check,
    };
    log::debug!("desired state {state} for {} packages", cli.packages.len());

    let reconciler = Reconciler::new(options);
    let mut log = DebugLog::new(cli.debug_in_stderr);

    match reconciler.run(state, &cli.packages, &mut log) {
        Ok(changed) => {
            let report = RunReport {
                name: cli.packages,
                state: state.to_string(),
                changed,
                debug_output: cli.debug_in_result.then(|| log.into_lines()),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(err) => {
            log::error!("reconciliation failed: {err}");
            let report = FailureReport::new(err.to_string());
            println!("{}", serde_json::to_string_pretty(&report)?);
            std::process::exit(1);
        }
    }
}
