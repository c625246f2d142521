//! Line-oriented front end for a [`CaptureSession`].
//!
//! Commands are read from any async line source (stdin in the binary), while
//! a fixed-cadence timer keeps the preview ticking and picks up finished
//! analyses between commands.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;
use tracing::trace;

use crate::convert::UnitConverter;
use crate::error::{BakeError, BakeResult};
use crate::session::CaptureSession;

pub const HELP: &str = "\
Commands:
  capture                               freeze the current camera frame
  retake                                drop the capture and resume the live feed
  analyze                               identify the captured ingredient
  cancel                                stop a running analysis
  detect                                identify whatever is in front of the camera
  convert <amount> <unit> [ingredient]  volume to grams (unit: cups, tbsp, tsp)
  ingredients                           list known ingredients
  status                                show the session state
  help                                  show this text
  quit                                  exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Capture,
    Retake,
    Analyze,
    Cancel,
    Detect,
    Convert {
        amount: String,
        unit: String,
        ingredient: Option<String>,
    },
    Ingredients,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(String::new());
        };
        let command = match head.to_ascii_lowercase().as_str() {
            "capture" | "c" => Command::Capture,
            "retake" | "r" => Command::Retake,
            "analyze" | "analyse" | "a" => Command::Analyze,
            "cancel" => Command::Cancel,
            "detect" | "d" => Command::Detect,
            "convert" => {
                let (Some(amount), Some(unit)) = (words.next(), words.next()) else {
                    return Err("Usage: convert <amount> <unit> [ingredient]".to_string());
                };
                let rest = words.collect::<Vec<_>>().join(" ");
                Command::Convert {
                    amount: amount.to_string(),
                    unit: unit.to_string(),
                    ingredient: (!rest.is_empty()).then_some(rest),
                }
            }
            "ingredients" | "list" => Command::Ingredients,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("Unknown command '{other}'. Type 'help' for commands.")),
        };
        Ok(command)
    }
}

/// Drive `session` from `input` until `quit` or end of input.
pub async fn run<R, W>(
    session: &mut CaptureSession,
    converter: &UnitConverter,
    input: R,
    out: &mut W,
    poll_interval: Duration,
) -> BakeResult<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    say(out, HELP)?;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|e| BakeError::io("reading commands", e))?;
                let Some(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        let reply = execute(session, converter, command).await;
                        say(out, &reply)?;
                    }
                    Err(message) => say(out, &message)?,
                }
            }
            _ = ticker.tick() => {
                if let Some(frame) = session.display_frame() {
                    trace!(sequence = frame.sequence, "preview frame");
                }
                if session.poll_analysis() {
                    say(out, session.status())?;
                }
            }
        }
    }

    session.shutdown();
    Ok(())
}

/// Run one command and return the text to show for it.
pub async fn execute(
    session: &mut CaptureSession,
    converter: &UnitConverter,
    command: Command,
) -> String {
    match command {
        Command::Capture => {
            let _ = session.capture();
            session.status().to_string()
        }
        Command::Retake => {
            session.retake();
            session.status().to_string()
        }
        Command::Analyze => {
            let _ = session.analyze();
            session.status().to_string()
        }
        Command::Cancel => {
            let _ = session.cancel_analysis();
            session.status().to_string()
        }
        Command::Detect => {
            let _ = session.detect().await;
            session.status().to_string()
        }
        Command::Convert {
            amount,
            unit,
            ingredient,
        } => {
            let ingredient = ingredient.or_else(|| {
                session
                    .last_identification()
                    .and_then(|id| id.ingredient())
                    .map(str::to_string)
            });
            let Some(ingredient) = ingredient else {
                return "Please name an ingredient: convert <amount> <unit> <ingredient>".to_string();
            };
            match converter.convert_text(&amount, &unit, &ingredient) {
                Ok(conversion) => conversion.to_string(),
                Err(e) => e.status_message(),
            }
        }
        Command::Ingredients => converter
            .table()
            .iter()
            .map(|(name, density)| format!("{name}: {density} g/mL"))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Status => format!(
            "[{:?}] backend={} {}",
            session.state(),
            session.identifier_name(),
            session.status()
        ),
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

fn say<W: Write>(out: &mut W, text: &str) -> BakeResult<()> {
    writeln!(out, "{text}")
        .and_then(|()| out.flush())
        .map_err(|e| BakeError::io("writing output", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_convert_with_multi_word_ingredient() {
        assert_eq!(
            Command::parse("convert 1.5 cups Powdered Sugar"),
            Ok(Command::Convert {
                amount: "1.5".into(),
                unit: "cups".into(),
                ingredient: Some("Powdered Sugar".into()),
            })
        );
        assert_eq!(
            Command::parse("convert 2 tbsp"),
            Ok(Command::Convert {
                amount: "2".into(),
                unit: "tbsp".into(),
                ingredient: None,
            })
        );
    }

    #[test]
    fn rejects_incomplete_and_unknown_commands() {
        assert!(Command::parse("convert 2").is_err());
        assert!(Command::parse("bake a cake").is_err());
        assert_eq!(Command::parse("  QUIT "), Ok(Command::Quit));
    }
}
