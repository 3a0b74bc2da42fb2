use anyhow::Context;
use clap::Parser;
use weather_lakehouse::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        cli.log_level
    };
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .context("failed to set tracing subscriber")?;

    let command = command_name(&cli);
    run(cli).with_context(|| format!("{} failed", command))
}

fn command_name(cli: &Cli) -> &'static str {
    use weather_lakehouse::cli::Commands;

    match cli.command {
        Commands::Extract { .. } => "extract",
        Commands::Transform { .. } => "transform",
        Commands::Quality { .. } => "quality",
        Commands::Load { .. } => "load",
        Commands::Run { .. } => "run",
        Commands::Info { .. } => "info",
    }
}
