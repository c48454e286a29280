use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rcreplay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a render control script against the software backend.
    Run(RunArgs),
    /// Print the opcode table.
    Opcodes,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input replay script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Feature flags JSON, overriding the script's own flags.
    #[arg(long)]
    features: Option<PathBuf>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Pretty-print the JSON report.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Opcodes => cmd_opcodes(),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut script = render_control::ReplayScript::from_path(&args.in_path)?;
    if let Some(path) = &args.features {
        script.features = render_control::FeatureFlags::from_path(path)?;
    }

    let report = script
        .run()
        .with_context(|| format!("replay '{}'", args.in_path.display()))?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("serialize replay report")?;

    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(out, json)
                .with_context(|| format!("write report '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_opcodes() -> anyhow::Result<()> {
    for op in render_control::RcOp::ALL {
        println!("{}\t{}", op.opcode(), op.name());
    }
    Ok(())
}
