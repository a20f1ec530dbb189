//! Line commands understood by the terminal front end.
use thiserror::Error;

use crate::model::ListKind;
use crate::pagination::PageNav;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Navigate(ListKind, PageNav),
    Toggle { facility_id: String, checked: bool },
    ToggleAll(bool),
    /// One-based row number in the rendered table.
    Review(ListKind, usize),
    Archive(usize),
    Dismiss(u64),
    Facilities,
    Activities,
    Check,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  next | prev | page N            page through active alerts
  archived next|prev|N            page through archived alerts
  toggle <facility_id> on|off     select or deselect one facility
  all on|off                      select or deselect every facility
  facilities                      list facilities and their state
  review N                        open row N of the active list
  archived-review N               open row N of the archived list
  archive N                       archive row N of the active list
  dismiss ID                      dismiss a notification
  activities                      refresh recent activity
  check                           poll for new alerts now
  help | quit";

fn on_off(word: Option<&str>, usage: &'static str) -> Result<bool, CommandError> {
    match word.map(str::to_ascii_lowercase).as_deref() {
        Some("on") | Some("true") | Some("1") => Ok(true),
        Some("off") | Some("false") | Some("0") => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn number<T: std::str::FromStr>(word: Option<&str>, usage: &'static str) -> Result<T, CommandError> {
    word.and_then(|w| w.parse().ok())
        .ok_or(CommandError::Usage(usage))
}

fn row(word: Option<&str>, usage: &'static str) -> Result<usize, CommandError> {
    match number::<usize>(word, usage)? {
        0 => Err(CommandError::Usage(usage)),
        n => Ok(n),
    }
}

fn nav(word: Option<&str>, usage: &'static str) -> Result<PageNav, CommandError> {
    match word {
        Some("next") => Ok(PageNav::Next),
        Some("prev") | Some("previous") => Ok(PageNav::Previous),
        other => number(other, usage).map(PageNav::Page),
    }
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let arg = words.next();
    let cmd = match head.to_ascii_lowercase().as_str() {
        "next" => Command::Navigate(ListKind::Active, PageNav::Next),
        "prev" | "previous" => Command::Navigate(ListKind::Active, PageNav::Previous),
        "page" => Command::Navigate(ListKind::Active, PageNav::Page(number(arg, "page N")?)),
        "archived" => Command::Navigate(ListKind::Archived, nav(arg, "archived next|prev|N")?),
        "toggle" => {
            let usage = "toggle <facility_id> on|off";
            let facility_id = arg.ok_or(CommandError::Usage(usage))?.to_string();
            let checked = on_off(words.next(), usage)?;
            Command::Toggle {
                facility_id,
                checked,
            }
        }
        "all" => Command::ToggleAll(on_off(arg, "all on|off")?),
        "review" => Command::Review(ListKind::Active, row(arg, "review N")?),
        "archived-review" => Command::Review(ListKind::Archived, row(arg, "archived-review N")?),
        "archive" => Command::Archive(row(arg, "archive N")?),
        "dismiss" => Command::Dismiss(number(arg, "dismiss ID")?),
        "facilities" => Command::Facilities,
        "activities" => Command::Activities,
        "check" => Command::Check,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(cmd)
}
