//! CLI handlers for sending the bot and watching its progress.
//!
//! This module handles terminal presentation and prompting.
//! Core logic lives in `app::MeetingService`.

use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::time::Duration;
use tracing::{info, warn};

use crate::api::TransportError;
use crate::app::{JoinError, MeetingService};
use crate::cli::args::JoinCliArgs;
use crate::config::Config;
use crate::meeting::{
    map_remote_status, MeetingConfig, SessionObserver, SessionResult, Stage, SubmitError,
};

pub async fn handle_join_command(args: JoinCliArgs) -> Result<()> {
    let config = Config::load()?;
    let service = MeetingService::from_config(&config)?;
    let interactive = io::stdin().is_terminal();
    let theme = ColorfulTheme::default();

    if interactive && service.current_user().is_none() {
        let name: String = Input::with_theme(&theme)
            .with_prompt("Your name (optional, attached to saved meetings)")
            .allow_empty(true)
            .interact_text()?;
        if !name.trim().is_empty() {
            service.set_current_user(&name)?;
        }
    }

    let (title, email) = match args.recent {
        Some(index) => {
            let saved = service.list_saved_meetings();
            let meeting = index
                .checked_sub(1)
                .and_then(|i| saved.get(i))
                .with_context(|| {
                    format!("No saved meeting #{index} (have {})", saved.len())
                })?;
            (meeting.title.clone(), meeting.email.clone())
        }
        None => (
            require(args.title, "Meeting title", interactive, &theme)?,
            require(args.email, "Bot account email", interactive, &theme)?,
        ),
    };
    let link = require(args.link, "Meeting link", interactive, &theme)?;
    let password = match args.password {
        Some(password) => password,
        None if interactive => Password::with_theme(&theme)
            .with_prompt("Bot account password")
            .interact()?,
        None => bail!("Password required: pass --password or set MEETSCRIBE_PASSWORD"),
    };

    let meeting = MeetingConfig::new(title, link, email, password);

    if args.no_wait {
        let submission = service
            .submit_meeting(&meeting)
            .await
            .map_err(|err| explain_submit_error(&err))?;
        report_saved(submission.persisted);
        println!(
            "Bot sent to \"{}\". Check progress with: meetscribe status",
            submission.accepted.title
        );
        return Ok(());
    }

    let (submission, mut handle) = service.join_meeting(&meeting).await.map_err(|err| match err {
        JoinError::Submit(err) => explain_submit_error(&err),
        JoinError::Session(err) => anyhow::anyhow!(err),
    })?;
    report_saved(submission.persisted);

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling session");
            canceller.cancel();
        }
    });

    let mut progress = ProgressObserver::new(!args.no_progress)?;
    let outcome = handle.observe(&mut progress).await;
    progress.finish();

    match outcome {
        Some(Stage::Completed) => {
            let result = progress
                .result
                .context("Session completed without a result")?;
            print_result(&result);
            service.acknowledge_session();
            Ok(())
        }
        Some(_) => {
            service.acknowledge_session();
            bail!(
                "{}",
                progress
                    .error
                    .unwrap_or_else(|| "Session failed".to_string())
            )
        }
        None => {
            println!("Cancelled. The bot may still be in the meeting.");
            Ok(())
        }
    }
}

pub async fn handle_status_command() -> Result<()> {
    let config = Config::load()?;
    let service = MeetingService::from_config(&config)?;

    let status = service.remote_status().await.map_err(|err| explain_transport_error(&err))?;
    let stage = map_remote_status(&status);
    let shown = if status.is_empty() { "<empty>" } else { status.as_str() };

    println!("Backend status: {}", shown);
    println!("Stage: {} ({})", stage.label(), stage.as_str());
    Ok(())
}

fn require(
    value: Option<String>,
    prompt: &str,
    interactive: bool,
    theme: &ColorfulTheme,
) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    if !interactive {
        bail!("{} is required", prompt);
    }
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .interact_text()?;
    Ok(value)
}

fn report_saved(persisted: bool) {
    if !persisted {
        eprintln!("Warning: could not write meeting history; this meeting will not be remembered.");
    }
}

fn explain_submit_error(err: &SubmitError) -> anyhow::Error {
    match err {
        SubmitError::Validation(validation) => {
            eprintln!("Please fix the following:");
            for issue in &validation.issues {
                eprintln!("  - {}: {}", issue.field.as_str(), issue.reason);
            }
            anyhow::anyhow!("Meeting details are invalid")
        }
        SubmitError::Transport(transport) => explain_transport_error(transport),
    }
}

fn explain_transport_error(err: &TransportError) -> anyhow::Error {
    match err {
        TransportError::Unreachable(_) => anyhow::anyhow!(
            "{}\nIs the meeting backend running? Set api.base_url in the config or MEETSCRIBE_API_URL.",
            err
        ),
        _ => anyhow::anyhow!("{}", err),
    }
}

fn print_result(result: &SessionResult) {
    println!("Meeting \"{}\" is done.", result.meeting_title);
    match result.summary_text() {
        Some(text) => println!("\n--- Summary ---\n{}", text),
        None => println!("The backend finished but returned no summary."),
    }
}

/// Shows the session stage on a spinner and keeps the outcome.
struct ProgressObserver {
    spinner: Option<ProgressBar>,
    result: Option<SessionResult>,
    error: Option<String>,
}

impl ProgressObserver {
    fn new(show: bool) -> Result<Self> {
        let spinner = if show {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}")?);
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        Ok(Self {
            spinner,
            result: None,
            error: None,
        })
    }

    fn finish(&self) {
        if let Some(pb) = &self.spinner {
            pb.finish_and_clear();
        }
    }
}

impl SessionObserver for ProgressObserver {
    fn on_stage_change(&mut self, stage: Stage) {
        match &self.spinner {
            Some(pb) => pb.set_message(stage.label()),
            None => eprintln!("{}", stage.label()),
        }
    }

    fn on_complete(&mut self, result: SessionResult) {
        self.result = Some(result);
    }

    fn on_error(&mut self, error: String) {
        self.error = Some(error);
    }

    fn on_poll_error(&mut self, error: &TransportError) {
        warn!("Could not reach the backend this time, will retry: {}", error);
    }
}
