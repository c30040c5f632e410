//! Parsing of the lines typed into the console.

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use kbs_bridge::notification::NotificationType;
use kbs_bridge::permission::PermissionState;
use kbs_bridge::work_entry::{EntryFilter, EntryTab, EntryType, MachineType, WorkEntry};

pub const HELP: &str = "\
Commands:
  list                      show the notification panel
  read <id>                 mark a notification as read
  clear <id>                remove a notification
  clear-all                 remove every notification
  add <type> <title> | <message>
                            add a notification (success, info, warning, error)
  enable                    enable push notifications
  allow | block | dismiss   answer a permission prompt
  reset <state>             change the permission from the host settings
  click <tag>               click a native notification
  entries [key=value ...]   list work entries; keys: tab (all, driver, admin),
                            from, to (YYYY-MM-DD), machine, driver, search
  delete <id>               delete a work entry
  save key=value | ...      create a work entry, or update it when id is given;
                            keys: id, client, driver, machine, date (required),
                            hours, total, received, advance, time (HH:MM)
  config                    show the configuration
  help                      show this help
  quit                      exit";

/// A console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Read(String),
    Clear(String),
    ClearAll,
    Add {
        notification_type: NotificationType,
        title: String,
        message: String,
    },
    Enable,
    /// Answer to the pending permission prompt.
    Answer(PermissionState),
    Reset(PermissionState),
    Click(String),
    Entries(EntryFilter),
    Delete(String),
    Save(WorkEntry),
    Config,
    Help,
    Quit,
}

fn required(argument: &str, usage: &str) -> anyhow::Result<String> {
    if argument.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(argument.to_string())
}

fn parse_type(value: &str) -> anyhow::Result<NotificationType> {
    match value.to_ascii_lowercase().as_str() {
        "success" => Ok(NotificationType::Success),
        "info" => Ok(NotificationType::Info),
        "warning" => Ok(NotificationType::Warning),
        "error" => Ok(NotificationType::Error),
        other => bail!("unknown notification type `{other}`"),
    }
}

fn parse_add(arguments: &str) -> anyhow::Result<Command> {
    const USAGE: &str = "add <type> <title> | <message>";
    let (notification_type, rest) = arguments
        .split_once(' ')
        .ok_or_else(|| anyhow!("usage: {USAGE}"))?;
    let (title, message) = rest
        .split_once('|')
        .ok_or_else(|| anyhow!("usage: {USAGE}"))?;

    Ok(Command::Add {
        notification_type: parse_type(notification_type)?,
        title: required(title.trim(), USAGE)?,
        message: message.trim().to_string(),
    })
}

fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date `{value}`, expected YYYY-MM-DD"))
}

fn parse_filter(arguments: &str) -> anyhow::Result<EntryFilter> {
    let mut filter = EntryFilter::default();
    for pair in arguments.split_whitespace() {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got `{pair}`"))?;
        match key {
            "tab" => {
                filter.tab = match value {
                    "all" => EntryTab::All,
                    "driver" => EntryTab::Driver,
                    "admin" => EntryTab::Admin,
                    other => bail!("unknown tab `{other}`"),
                }
            }
            "from" => filter.date_from = Some(parse_date(value)?),
            "to" => filter.date_to = Some(parse_date(value)?),
            "machine" => {
                let machine = value
                    .parse::<MachineType>()
                    .map_err(|error| anyhow!(error))?;
                filter.machine_type = Some(machine);
            }
            "driver" => filter.driver = Some(value.to_string()),
            "search" => filter.search = Some(value.to_string()),
            other => bail!("unknown filter `{other}`"),
        }
    }
    Ok(filter)
}

fn parse_amount(key: &str, value: &str) -> anyhow::Result<f64> {
    value
        .parse()
        .with_context(|| format!("invalid number `{value}` for {key}"))
}

fn parse_save(arguments: &str) -> anyhow::Result<Command> {
    let mut id = None;
    let mut client = None;
    let mut driver = None;
    let mut machine = None;
    let mut date = None;
    let mut time = None;
    let (mut hours, mut total, mut received, mut advance) = (0.0, 0.0, 0.0, 0.0);

    for field in arguments.split('|').map(str::trim).filter(|field| !field.is_empty()) {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got `{field}`"))?;
        let value = value.trim();
        match key.trim() {
            "id" => id = Some(value.to_string()),
            "client" => client = Some(value.to_string()),
            "driver" => driver = Some(value.to_string()),
            "machine" => machine = Some(value.parse::<MachineType>().map_err(|error| anyhow!(error))?),
            "date" => date = Some(parse_date(value)?),
            "time" => time = Some(value.to_string()),
            "hours" => hours = parse_amount(key, value)?,
            "total" => total = parse_amount(key, value)?,
            "received" => received = parse_amount(key, value)?,
            "advance" => advance = parse_amount(key, value)?,
            other => bail!("unknown field `{other}`"),
        }
    }

    Ok(Command::Save(WorkEntry {
        id,
        rental_person_name: client.context("client is required")?,
        driver_name: driver.context("driver is required")?,
        machine_type: machine.context("machine is required")?,
        hours_driven: hours,
        total_amount: total,
        amount_received: received,
        advance_amount: advance,
        date: date.context("date is required")?,
        time,
        entry_type: EntryType::Admin,
        created_at: None,
        updated_at: None,
    }))
}

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (name, arguments) = line.split_once(' ').unwrap_or((line, ""));
        let arguments = arguments.trim();

        let command = match name {
            "list" | "ls" => Self::List,
            "read" => Self::Read(required(arguments, "read <id>")?),
            "clear" => Self::Clear(required(arguments, "clear <id>")?),
            "clear-all" => Self::ClearAll,
            "add" => parse_add(arguments)?,
            "enable" => Self::Enable,
            "allow" => Self::Answer(PermissionState::Granted),
            "block" => Self::Answer(PermissionState::Denied),
            "dismiss" => Self::Answer(PermissionState::Default),
            "reset" => Self::Reset(
                required(arguments, "reset <default|granted|denied>")?
                    .parse()
                    .map_err(|error: String| anyhow!(error))?,
            ),
            "click" => Self::Click(required(arguments, "click <tag>")?),
            "entries" => Self::Entries(parse_filter(arguments)?),
            "delete" => Self::Delete(required(arguments, "delete <id>")?),
            "save" => parse_save(arguments)?,
            "config" => Self::Config,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command `{other}`, type `help`"),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert!(Command::parse("   ").unwrap().is_none());
    }

    #[test]
    fn parses_notification_commands() {
        assert_eq!(parse("read 1715000000000abc"), Command::Read("1715000000000abc".into()));
        assert_eq!(parse("clear-all"), Command::ClearAll);
        assert_eq!(
            parse("add warning Low fuel | JCB 3 needs diesel"),
            Command::Add {
                notification_type: NotificationType::Warning,
                title: "Low fuel".into(),
                message: "JCB 3 needs diesel".into(),
            }
        );
        assert!(Command::parse("read").is_err());
        assert!(Command::parse("add urgent x | y").is_err());
    }

    #[test]
    fn parses_permission_commands() {
        assert_eq!(parse("allow"), Command::Answer(PermissionState::Granted));
        assert_eq!(parse("block"), Command::Answer(PermissionState::Denied));
        assert_eq!(parse("reset granted"), Command::Reset(PermissionState::Granted));
        assert!(Command::parse("reset maybe").is_err());
    }

    #[test]
    fn parses_entry_filters() {
        let command = parse("entries tab=driver from=2024-05-01 machine=jcb search=rao");
        assert_eq!(
            command,
            Command::Entries(EntryFilter {
                tab: EntryTab::Driver,
                date_from: NaiveDate::from_ymd_opt(2024, 5, 1),
                machine_type: Some(MachineType::Jcb),
                search: Some("rao".into()),
                ..EntryFilter::default()
            })
        );
        assert_eq!(parse("entries"), Command::Entries(EntryFilter::default()));
        assert!(Command::parse("entries from=01/05/2024").is_err());
        assert!(Command::parse("entries colour=red").is_err());
    }

    #[test]
    fn parses_saved_entries() {
        let command = parse(
            "save client=Mr. Rao | driver=Vignesh | machine=JCB | date=2024-05-03 | hours=4 | total=6000",
        );
        let Command::Save(entry) = command else {
            panic!("expected a save command");
        };
        assert_eq!(entry.id, None);
        assert_eq!(entry.rental_person_name, "Mr. Rao");
        assert_eq!(entry.machine_type, MachineType::Jcb);
        assert_eq!(entry.hours_driven, 4.0);
        assert_eq!(entry.total_amount, 6000.0);
        assert_eq!(entry.amount_received, 0.0);
        assert_eq!(entry.time, None);

        let Command::Save(entry) = parse(
            "save id=42 | client=Mr. Rao | driver=Vignesh | machine=tractor | date=2024-05-03 | time=14:30",
        ) else {
            panic!("expected a save command");
        };
        assert_eq!(entry.id.as_deref(), Some("42"));
        assert_eq!(entry.time.as_deref(), Some("14:30"));

        let error = Command::parse("save client=Mr. Rao | machine=jcb | date=2024-05-03").unwrap_err();
        assert!(error.to_string().contains("driver is required"));
        assert!(Command::parse("save client=a | driver=b | machine=jcb | date=2024-05-03 | total=lots").is_err());
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let error = Command::parse("launch").unwrap_err();
        assert!(error.to_string().contains("unknown command"));
    }
}
