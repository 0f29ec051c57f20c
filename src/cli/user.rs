use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Input};
use std::io::{self, IsTerminal};

use crate::app::MeetingService;
use crate::config::Config;

use super::args::{UserCliArgs, UserCommand};

pub fn handle_user_command(args: UserCliArgs) -> Result<()> {
    let config = Config::load()?;
    let service = MeetingService::from_config(&config)?;

    match args.command {
        UserCommand::Show => match service.current_user() {
            Some(profile) => println!(
                "{} (saved {})",
                profile.name,
                profile.saved_at.format("%Y-%m-%d %H:%M")
            ),
            None => println!("No user name saved."),
        },
        UserCommand::Set { name } => {
            let name = match name {
                Some(name) => name,
                None if io::stdin().is_terminal() => Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("Your name")
                    .interact_text()?,
                None => bail!("Name is required"),
            };
            let profile = service.set_current_user(&name)?;
            println!("Saved user name: {}", profile.name);
        }
        UserCommand::Clear => {
            service.clear_current_user()?;
            println!("User name cleared.");
        }
    }

    Ok(())
}
