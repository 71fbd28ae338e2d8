//! Line-driven loop around a correction session.

use anyhow::Result;
use std::io::{BufRead, Write};

use super::CorrectionSession;
use super::command::{Command, HELP};
use crate::ocr::Recognizer;

/// Reads commands from `input` until `quit` or end of input.
///
/// Command errors are reported on `output` and the loop continues. Only I/O
/// errors on the streams end the session early.
pub fn run_session<R, I, W>(
    session: &mut CorrectionSession<'_, R>,
    input: I,
    output: &mut W,
) -> Result<()>
where
    R: Recognizer + ?Sized,
    I: BufRead,
    W: Write,
{
    writeln!(output, "{} unresolved records. Type 'help' for commands.", unresolved_count(session))?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "{}", e)?;
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }

        if let Err(e) = dispatch(session, command, output) {
            writeln!(output, "Error: {:#}", e)?;
        }
    }

    writeln!(output)?;
    Ok(())
}

fn unresolved_count<R: Recognizer + ?Sized>(session: &CorrectionSession<'_, R>) -> usize {
    session.store().pending_urls().len()
}

fn dispatch<R, W>(session: &mut CorrectionSession<'_, R>, command: Command, output: &mut W) -> Result<()>
where
    R: Recognizer + ?Sized,
    W: Write,
{
    match command {
        Command::List => {
            let sentinel = session.store().schema().sentinel.clone();
            for record in session.store().records().iter().filter(|r| !r.is_resolved()) {
                writeln!(output, "{}\t{}", record.url, record.timestamp.to_cell(&sentinel))?;
            }
            writeln!(output, "{} unresolved", unresolved_count(session))?;
        }
        Command::Open(url) => {
            session.open(&url)?;
            writeln!(output, "{}", session.state().summary())?;
        }
        Command::Next => match session.next_unresolved()? {
            Some(_) => writeln!(output, "{}", session.state().summary())?,
            None => writeln!(output, "No unresolved records left")?,
        },
        Command::Select(rect) => {
            session.select_region(rect)?;
            writeln!(output, "{}", session.state().summary())?;
        }
        Command::Clear => {
            session.clear_selection()?;
            writeln!(output, "Selection cleared")?;
        }
        Command::Rotate(degrees) => {
            session.rotate(degrees)?;
            writeln!(output, "{}", session.state().summary())?;
        }
        Command::Extract => {
            session.extract();
            writeln!(output, "{}", session.state().status.status_text())?;
        }
        Command::Set(text) => {
            session.set_text(&text);
            writeln!(output, "timestamp='{}'", session.state().field)?;
        }
        Command::Commit => {
            session.commit()?;
            writeln!(output, "{}", session.state().status.status_text())?;
        }
        Command::Show => writeln!(output, "{}", session.state().summary())?,
        Command::Help => writeln!(output, "{}", HELP)?,
        Command::Quit => {}
    }
    Ok(())
}
