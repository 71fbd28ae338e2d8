//! Line commands for the correction loop.

use anyhow::{Result, anyhow};
use std::str::FromStr;

use crate::automation::config::PixelRect;

pub const HELP: &str = "\
Commands:
  list                 show unresolved records
  open <url>           open a record
  next                 open the next unresolved record
  select <x> <y> <w> <h>
                       select a region of the displayed image
  clear                clear the selection
  rotate left|right|<degrees>
                       rotate the displayed image (multiples of 90)
  extract              read a time from the selection
  set <text>           set the timestamp field (may be empty)
  commit               save the field to the open record
  show                 show the open record
  help                 show this help
  quit                 leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Open(String),
    Next,
    Select(PixelRect),
    Clear,
    Rotate(i32),
    Extract,
    Set(String),
    Commit,
    Show,
    Help,
    Quit,
}

fn parse_u32(token: Option<&str>, name: &str) -> Result<u32> {
    let token = token.ok_or_else(|| anyhow!("Missing {}", name))?;
    token
        .parse()
        .map_err(|_| anyhow!("Invalid {}: '{}'", name, token))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => Ok(Command::List),
            "open" | "o" => {
                if rest.is_empty() {
                    Err(anyhow!("Usage: open <url>"))
                } else {
                    Ok(Command::Open(rest.to_string()))
                }
            }
            "next" | "n" => Ok(Command::Next),
            "select" | "sel" => {
                let mut parts = rest.split_whitespace();
                let x = parse_u32(parts.next(), "x")?;
                let y = parse_u32(parts.next(), "y")?;
                let w = parse_u32(parts.next(), "width")?;
                let h = parse_u32(parts.next(), "height")?;
                if parts.next().is_some() {
                    return Err(anyhow!("Usage: select <x> <y> <w> <h>"));
                }
                Ok(Command::Select(PixelRect::from_xywh(x, y, w, h)))
            }
            "clear" => Ok(Command::Clear),
            "rotate" | "r" => match rest {
                "left" | "l" => Ok(Command::Rotate(-90)),
                "right" | "r" => Ok(Command::Rotate(90)),
                other => other
                    .parse()
                    .map(Command::Rotate)
                    .map_err(|_| anyhow!("Usage: rotate left|right|<degrees>")),
            },
            "extract" | "x" => Ok(Command::Extract),
            // Set keeps the remainder verbatim, including internal spaces
            "set" => Ok(Command::Set(rest.to_string())),
            "commit" | "c" => Ok(Command::Commit),
            "show" | "s" => Ok(Command::Show),
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            "" => Err(anyhow!("Empty command")),
            other => Err(anyhow!("Unknown command: '{}' (try 'help')", other)),
        }
    }
}
