// TerminalRenderer - sparkline status line on stderr
//
// The terminal has no plot area, so a frame is summarised as one line with
// the latest values, the thresholds and a sparkline of the smoothed tail.

use std::io::{self, Write};

use super::{Frame, Renderer, ViewBounds};

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_WIDTH: usize = 48;

/// Status-line renderer for terminals
///
/// Every `every_n_frames` frames it writes one line with the latest raw and
/// smoothed values, the thresholds and a sparkline of the smoothed tail,
/// scaled into the frame's fixed y range.
pub struct TerminalRenderer {
    out: Box<dyn Write + Send>,
    every_n_frames: u64,
}

impl TerminalRenderer {
    pub fn new(every_n_frames: u64) -> Self {
        Self::with_writer(Box::new(io::stderr()), every_n_frames)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, every_n_frames: u64) -> Self {
        Self {
            out,
            every_n_frames: every_n_frames.max(1),
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, frame: &Frame) {
        if frame.index % self.every_n_frames != 0 {
            return;
        }
        let line = status_line(frame);
        if let Err(err) = writeln!(self.out, "{}", line) {
            tracing::debug!("[TerminalRenderer] Write failed: {}", err);
        }
    }
}

fn status_line(frame: &Frame) -> String {
    let raw = frame
        .latest_raw()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());
    let smoothed = frame
        .latest_smoothed()
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string());
    let tail_start = frame.smoothed.len().saturating_sub(SPARK_WIDTH);

    format!(
        "[{:>7}] raw {:>5}  avg {:>8}  low {} mid {} high {}  {}",
        frame.total_samples,
        raw,
        smoothed,
        frame.thresholds.low,
        frame.thresholds.mid,
        frame.thresholds.high,
        sparkline(&frame.smoothed[tail_start..], &frame.bounds)
    )
}

fn sparkline(values: &[f64], bounds: &ViewBounds) -> String {
    let span = bounds.y_max - bounds.y_min;
    values
        .iter()
        .map(|&value| {
            let norm = if span > 0.0 {
                ((value - bounds.y_min) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let idx = (norm * (SPARK_CHARS.len() - 1) as f64).round() as usize;
            SPARK_CHARS[idx]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ThresholdSet;
    use crate::signal::SignalSnapshot;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn bounds() -> ViewBounds {
        ViewBounds {
            x_min: 0.0,
            x_max: 200.0,
            y_min: 300.0,
            y_max: 320.0,
        }
    }

    fn frame(index: u64) -> Frame {
        Frame::new(
            index,
            SignalSnapshot {
                raw: vec![300, 310, 320],
                smoothed: vec![300.0, 310.0, 320.0],
                total_pushed: 3,
            },
            ThresholdSet::new(308.0, 310.0, 312.0),
            bounds(),
        )
    }

    #[test]
    fn test_sparkline_spans_bounds() {
        let line = sparkline(&[300.0, 310.0, 320.0, 250.0, 400.0], &bounds());
        assert_eq!(line, "▁▅█▁█");
    }

    #[test]
    fn test_renders_every_n_frames() {
        let writer = SharedWriter::default();
        let mut renderer = TerminalRenderer::with_writer(Box::new(writer.clone()), 5);
        for index in 0..10 {
            renderer.render(&frame(index));
        }

        let output = String::from_utf8(writer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("raw   320"));
        assert!(output.contains("avg   320.00"));
        assert!(output.contains("low 308 mid 310 high 312"));
    }
}
