use clap::Parser;
use reqlog_cli::{init_logging, run, Args};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.logging_config())?;

    let stdout = std::io::stdout();
    run(&args.command, &mut stdout.lock())
}
