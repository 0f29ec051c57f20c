pub mod args;
pub mod history;
pub mod meeting;
pub mod user;

pub use args::{Cli, CliCommand};
pub use history::handle_history_command;
pub use meeting::{handle_join_command, handle_status_command};
pub use user::handle_user_command;
