use std::{env, sync::OnceLock};

use anyhow::{Context, bail};
use regex::Regex;

use local_calendar::{
    CalendarEntry, CalendarRegistrar, RegistrarError,
    account::{AccountRegistry, Delay},
    provider::CalendarProvider,
};

pub const USAGE: &str = "Usage: local-calendar <command>

Commands:
  list [--json]                         List calendars owned by the local account
  create <name> [--color <hex>]         Create a calendar
  update <id> <name> [--color <hex>]    Rename or recolor a calendar
  delete <id>                           Delete a calendar

Colors: #RRGGBB, #AARRGGBB, 0xRRGGBB or 0xAARRGGBB";

/// Google Calendar's default blue, fully opaque.
pub const DEFAULT_COLOR: i32 = 0xFF1A73E8_u32 as i32;

#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    List { json: bool },
    Create { name: String, color: i32 },
    Update { id: i64, name: String, color: i32 },
    Delete { id: i64 },
    Help,
}

pub fn parse_cli_command() -> Result<CliCommand, String> {
    parse_args(env::args().skip(1))
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliCommand, String> {
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(CliCommand::Help);
    };

    let mut positional = Vec::new();
    let mut color = None;
    let mut json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--color" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--color needs a value".to_string())?;
                color = Some(parse_color(&value)?);
            }
            "--json" => json = true,
            "--help" => return Ok(CliCommand::Help),
            _ if arg.starts_with("--") => return Err(format!("Unknown argument: {}", arg)),
            _ => positional.push(arg),
        }
    }

    let color = color.unwrap_or(DEFAULT_COLOR);
    match (command.as_str(), positional.as_slice()) {
        ("list", []) => Ok(CliCommand::List { json }),
        ("create", [name]) => Ok(CliCommand::Create {
            name: name.clone(),
            color,
        }),
        ("update", [id, name]) => Ok(CliCommand::Update {
            id: parse_id(id)?,
            name: name.clone(),
            color,
        }),
        ("delete", [id]) => Ok(CliCommand::Delete { id: parse_id(id)? }),
        ("help" | "--help", _) => Ok(CliCommand::Help),
        ("list" | "create" | "update" | "delete", _) => {
            Err(format!("Wrong number of arguments for '{}'", command))
        }
        _ => Err(format!("Unknown command: {}", command)),
    }
}

fn parse_id(value: &str) -> Result<i64, String> {
    value
        .parse::<i64>()
        .map_err(|_| format!("Invalid calendar id '{}'", value))
}

fn color_regex() -> &'static Regex {
    static COLOR: OnceLock<Regex> = OnceLock::new();
    COLOR.get_or_init(|| {
        Regex::new(r"^(?:#|0[xX])?([0-9A-Fa-f]{8}|[0-9A-Fa-f]{6})$").expect("color pattern is valid")
    })
}

/// Parses a hex color into a packed ARGB value. Six-digit colors are opaque.
pub fn parse_color(value: &str) -> Result<i32, String> {
    let digits = color_regex()
        .captures(value.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| format!("Invalid color '{}'. Use #RRGGBB or #AARRGGBB.", value))?;

    let packed = u32::from_str_radix(digits, 16).map_err(|e| e.to_string())?;
    let argb = if digits.len() == 6 { 0xFF00_0000 | packed } else { packed };
    Ok(argb as i32)
}

pub fn run_command<P, R, D>(registrar: &CalendarRegistrar<P, R, D>, command: CliCommand) -> anyhow::Result<()>
where
    P: CalendarProvider,
    R: AccountRegistry,
    D: Delay,
{
    match command {
        CliCommand::Help => println!("{}", USAGE),
        CliCommand::List { json } => {
            let calendars = registrar.list_calendars()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&calendars)?);
            } else {
                println!("{}", format_calendar_list(&calendars));
            }
        }
        CliCommand::Create { name, color } => {
            let entry = registrar
                .create_calendar(name.as_str(), color)
                .map_err(explain)
                .with_context(|| format!("Failed to create calendar '{}'", name))?;
            println!("Created {}", format_calendar_line(&entry));
        }
        CliCommand::Update { id, name, color } => {
            registrar
                .update_calendar(id, &name, color)
                .map_err(explain)
                .with_context(|| format!("Failed to update calendar {}", id))?;
            println!("Updated calendar {}", id);
        }
        CliCommand::Delete { id } => {
            if !registrar.delete_calendar(id)? {
                bail!("No calendar with id {} was deleted", id);
            }
            println!("Deleted calendar {}", id);
        }
    }
    Ok(())
}

fn explain(error: RegistrarError) -> anyhow::Error {
    match error.user_hint() {
        Some(hint) => anyhow::Error::new(error).context(hint),
        None => error.into(),
    }
}

fn format_calendar_line(entry: &CalendarEntry) -> String {
    format!("{:>4}  {}  {}", entry.id, entry.color_hex(), entry.display_name)
}

fn format_calendar_list(calendars: &[CalendarEntry]) -> String {
    if calendars.is_empty() {
        return "No local calendars.".to_string();
    }
    calendars
        .iter()
        .map(format_calendar_line)
        .collect::<Vec<_>>()
        .join("\n")
}
