use anyhow::Result;

use crate::app::MeetingService;
use crate::config::Config;
use crate::history::StoredMeeting;

use super::args::HistoryCliArgs;

pub fn handle_history_command(args: HistoryCliArgs) -> Result<()> {
    let config = Config::load()?;
    let service = MeetingService::from_config(&config)?;
    let meetings = service.list_saved_meetings();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&meetings)?);
        return Ok(());
    }

    if meetings.is_empty() {
        println!("No saved meetings yet.");
        return Ok(());
    }

    println!("Saved meetings (most recent first):\n");
    for (index, meeting) in meetings.iter().enumerate() {
        println!("{}", format_entry(index + 1, meeting));
    }

    println!("\nTo join one again, use: meetscribe join --recent <#> --link <URL>");

    Ok(())
}

fn format_entry(position: usize, meeting: &StoredMeeting) -> String {
    let saved = meeting.saved_at.format("%Y-%m-%d %H:%M");
    match &meeting.owner_name {
        Some(owner) => format!(
            "#{} {} <{}> saved {} by {}",
            position, meeting.title, meeting.email, saved, owner
        ),
        None => format!(
            "#{} {} <{}> saved {}",
            position, meeting.title, meeting.email, saved
        ),
    }
}
