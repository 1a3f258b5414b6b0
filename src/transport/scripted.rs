// ScriptedLineSource - replays a fixed sequence of reads
//
// Used by tests and by `emgctl run --replay <file>`. Each scripted entry is
// either a line or a transport error. Once the script is exhausted the source
// either idles (returns `Ok(None)` like a read timeout) or triggers a
// shutdown signal so the acquisition loop ends deterministically.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use super::LineSource;
use crate::error::TransportError;
use crate::shutdown::ShutdownSignal;

/// Pause per `Ok(None)` once exhausted, standing in for a read timeout
const IDLE_POLL: Duration = Duration::from_millis(5);

pub struct ScriptedLineSource {
    script: VecDeque<Result<String, TransportError>>,
    interval: Duration,
    on_exhausted: Option<ShutdownSignal>,
}

impl ScriptedLineSource {
    pub fn new(script: Vec<Result<String, TransportError>>) -> Self {
        Self {
            script: script.into(),
            interval: Duration::ZERO,
            on_exhausted: None,
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(|line| Ok(line.into())).collect())
    }

    /// One sample per line, e.g. a capture taken with a terminal program
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::from_lines(
            contents.lines().map(|line| format!("{}\n", line)),
        ))
    }

    /// Delay before each scripted read
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Trigger `signal` when the script runs out
    pub fn shutdown_when_exhausted(mut self, signal: ShutdownSignal) -> Self {
        self.on_exhausted = Some(signal);
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LineSource for ScriptedLineSource {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        match self.script.pop_front() {
            Some(entry) => {
                if !self.interval.is_zero() {
                    std::thread::sleep(self.interval);
                }
                entry.map(Some)
            }
            None => {
                match &self.on_exhausted {
                    Some(signal) => signal.trigger(),
                    None => std::thread::sleep(IDLE_POLL),
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_lines_and_errors_in_order() {
        let mut source = ScriptedLineSource::new(vec![
            Ok("305".to_string()),
            Err(TransportError::Disconnected),
            Ok("306".to_string()),
        ]);
        assert_eq!(source.read_line(), Ok(Some("305".to_string())));
        assert_eq!(source.read_line(), Err(TransportError::Disconnected));
        assert_eq!(source.read_line(), Ok(Some("306".to_string())));
        assert_eq!(source.read_line(), Ok(None));
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_exhaustion_triggers_shutdown() {
        let signal = ShutdownSignal::new();
        let mut source =
            ScriptedLineSource::from_lines(["1"]).shutdown_when_exhausted(signal.clone());
        assert_eq!(source.read_line(), Ok(Some("1".to_string())));
        assert!(!signal.is_triggered());
        assert_eq!(source.read_line(), Ok(None));
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("emg-replay-{}.txt", std::process::id()));
        fs::write(&path, "300\n301\nnoise\n").unwrap();
        let mut source = ScriptedLineSource::from_file(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(source.remaining(), 3);
        assert_eq!(source.read_line(), Ok(Some("300\n".to_string())));
    }
}
