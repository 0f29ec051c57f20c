use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "meetscribe")]
#[command(about = "Send a bot to your meeting and get the summary", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Send the bot into a meeting and follow it until the summary is ready
    Join(JoinCliArgs),
    /// Show the bot's current progress as reported by the backend
    Status,
    /// List recently used meetings
    History(HistoryCliArgs),
    /// Manage the local user name attached to saved meetings
    User(UserCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct JoinCliArgs {
    /// Meeting title (also the series the summary is filed under)
    #[arg(short, long)]
    pub title: Option<String>,
    /// Meeting link (Google Meet, Zoom or Microsoft Teams)
    #[arg(short, long)]
    pub link: Option<String>,
    /// Account email the bot signs in with
    #[arg(short, long)]
    pub email: Option<String>,
    /// Account password; prompted for when omitted
    #[arg(long, env = "MEETSCRIBE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Reuse title and email from a saved meeting (1 = most recent)
    #[arg(short, long, conflicts_with_all = ["title", "email"])]
    pub recent: Option<usize>,
    /// Return once the bot has been sent instead of waiting for the summary
    #[arg(long)]
    pub no_wait: bool,
    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct HistoryCliArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct UserCliArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Show the saved user name
    Show,
    /// Save a user name
    Set {
        /// Your name
        name: Option<String>,
    },
    /// Forget the saved user name
    Clear,
}
