// Console front end for the control surface
//
// Stdin lines are parsed on a forwarder thread and queued as `UiEvent`s, so
// the control surface only ever sees typed events. `ConsoleView` prints the
// label and threshold state to stdout.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use super::{ControlView, UiEvent, UiNotifier};
use crate::analysis::{ThresholdEvent, ThresholdField, ThresholdSet};

pub const HELP_TEXT: &str = "Commands:
  low <value>    set the Rest / Movement 1 boundary
  mid <value>    set the Movement 1 / Movement 2 boundary
  high <value>   set the Movement 2 / Movement 3 boundary
  show           print thresholds and the current classification
  help           print this help
  quit           stop the pipeline";

/// Parse one console line
///
/// Blank lines yield `None`; anything unrecognised becomes
/// `UiEvent::Rejected` so the operator sees why.
pub fn parse_command(line: &str) -> Option<UiEvent> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next()?.to_ascii_lowercase();

    let rejected = |reason: &str| {
        Some(UiEvent::Rejected {
            input: line.trim().to_string(),
            reason: reason.to_string(),
        })
    };

    let field = match keyword.as_str() {
        "low" => ThresholdField::Low,
        "mid" => ThresholdField::Mid,
        "high" => ThresholdField::High,
        "show" | "status" => return Some(UiEvent::ShowStatus),
        "help" | "?" => return Some(UiEvent::Help),
        "quit" | "exit" | "q" => return Some(UiEvent::Quit),
        _ => return rejected("unknown command, type 'help'"),
    };

    let value = match parts.next().map(str::parse::<f64>) {
        Some(Ok(value)) if value.is_finite() => value,
        Some(_) => return rejected("value must be a number"),
        None => return rejected("missing value"),
    };
    if parts.next().is_some() {
        return rejected("too many arguments");
    }

    Some(UiEvent::Threshold(ThresholdEvent::new(field, value)))
}

/// Forward stdin commands to the control surface
///
/// The thread ends on EOF, on a read error, or once the surface is gone.
/// It is never joined: a blocked stdin read cannot be interrupted.
pub fn spawn_console_input(notifier: UiNotifier) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!("[Console] stdin read failed: {}", err);
                        break;
                    }
                };
                if let Some(event) = parse_command(&line) {
                    if !notifier.send(event) {
                        break;
                    }
                }
            }
            tracing::debug!("[Console] Input forwarder finished");
        })
}

/// Prints control-surface state to stdout
pub struct ConsoleView {
    out: Box<dyn Write + Send>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    fn print(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            tracing::debug!("[Console] Write failed: {}", err);
        }
    }
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlView for ConsoleView {
    fn show_label(&mut self, label: &str) {
        self.print(&format!("Classification: {}", label));
    }

    fn show_thresholds(&mut self, thresholds: &ThresholdSet) {
        self.print(&format!(
            "Thresholds: low {}  mid {}  high {}",
            thresholds.low, thresholds.mid, thresholds.high
        ));
    }

    fn show_message(&mut self, message: &str) {
        self.print(message);
    }
}
