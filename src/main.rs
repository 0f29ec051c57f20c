use anyhow::Result;
use clap::Parser;
use meetscribe::cli::{
    handle_history_command, handle_join_command, handle_status_command, handle_user_command, Cli,
    CliCommand,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        CliCommand::Version => {
            println!("meetscribe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Join(args) => handle_join_command(args).await,
        CliCommand::Status => handle_status_command().await,
        CliCommand::History(args) => handle_history_command(args),
        CliCommand::User(args) => handle_user_command(args),
    }
}
