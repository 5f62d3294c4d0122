use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use netcfg_diff_core::{format_json, Configuration, Model, Reconciliation};
use netcfg_sync::device::{load_device, load_target, resolve_model, CiscoDevice, Device};
use netcfg_sync::inspect::{collect_objects, render_grammar, render_objects};
use netcfg_sync::report::{compare_info, render_changes, render_summary};
use netcfg_sync::settings::Settings;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{
    Cli, Command, CompareArgs, DiffArgs, GrammarArgs, InspectArgs, OutputFormat, ReportArgs,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR>>> {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.settings.as_deref())?;
    match cli.command {
        Command::Compare(args) => run_compare(args, &settings),
        Command::Diff(args) => run_diff(args, &settings),
        Command::Inspect(args) => run_inspect(args, &settings),
        Command::Grammar(args) => run_grammar(args, &settings),
    }
}

fn device_for(model: Model, settings: &Settings) -> Result<CiscoDevice> {
    debug!("Using model {model}");
    CiscoDevice::new(model, settings.tuning.clone())
        .with_context(|| format!("invalid grammar of {model}"))
}

fn run_compare(args: CompareArgs, settings: &Settings) -> Result<()> {
    let model = resolve_model(
        args.output.model,
        &[args.file2.as_path(), args.file1.as_path()],
        settings.default_model,
    )?;
    let device = device_for(model, settings)?;
    let current = load_target(&device, &args.file1)?;
    let target = load_target(&device, &args.file2)?;
    reconcile_and_report(&device, current, target, &args.output)
}

fn run_diff(args: DiffArgs, settings: &Settings) -> Result<()> {
    let model = resolve_model(
        args.output.model,
        &[args.target.as_path()],
        settings.default_model,
    )?;
    let device = device_for(model, settings)?;
    let current = load_device(&device, &args.device)?;
    let target = load_target(&device, &args.target)?;
    reconcile_and_report(&device, current, target, &args.output)
}

fn reconcile_and_report(
    device: &dyn Device,
    current: Configuration,
    target: Configuration,
    output: &ReportArgs,
) -> Result<()> {
    let result = device.reconcile(current, target)?;
    print_result(&result, output);
    Ok(())
}

/// Warnings and notes were already logged by the reconciliation.
fn print_result(result: &Reconciliation, output: &ReportArgs) {
    match output.format {
        OutputFormat::Text => {
            if result.has_changes() {
                println!("{}", render_changes(result));
            }
            if !output.quiet {
                eprintln!("{}", render_summary(result));
            }
        }
        OutputFormat::Json => println!("{}", format_json(result)),
    }
    if !output.quiet {
        eprintln!("{}", compare_info(result));
    }
}

fn run_inspect(args: InspectArgs, settings: &Settings) -> Result<()> {
    let model = resolve_model(args.model, &[args.file.as_path()], settings.default_model)?;
    let device = device_for(model, settings)?;
    let cfg = load_device(&device, &args.file)?;
    let entries = collect_objects(&cfg, args.prefix.as_deref());
    if entries.is_empty() {
        warn!("No objects found in {}", args.file.display());
    }
    match args.format {
        OutputFormat::Text => print!("{}", render_objects(&entries)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

fn run_grammar(args: GrammarArgs, settings: &Settings) -> Result<()> {
    let model = args
        .model
        .or(settings.default_model)
        .context("No model given, use --model")?;
    let grammar = model
        .grammar()
        .with_context(|| format!("invalid grammar of {model}"))?;
    print!("{}", render_grammar(&grammar));
    Ok(())
}
