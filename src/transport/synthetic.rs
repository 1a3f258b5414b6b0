// SyntheticLineSource - simulated EMG sensor for running without hardware
//
// Produces newline-terminated integer lines that cycle through a rest level
// and three activation levels, with uniform noise on top. A small share of
// lines is garbage so the discard path is exercised too.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::LineSource;
use crate::error::TransportError;

/// Shape of the simulated signal
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Delay before each line, emulating the sensor's output rate
    pub sample_interval: Duration,
    /// Mean signal level of each phase, visited in order and repeated
    pub levels: Vec<f64>,
    /// Lines emitted per phase
    pub samples_per_level: usize,
    /// Peak uniform noise added to every sample
    pub noise_amplitude: f64,
    /// Probability that a line is garbage instead of a number
    pub garbage_probability: f64,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(2),
            levels: vec![304.0, 309.0, 311.0, 316.0],
            samples_per_level: 500,
            noise_amplitude: 3.0,
            garbage_probability: 0.01,
            seed: None,
        }
    }
}

pub struct SyntheticLineSource {
    config: SyntheticConfig,
    rng: StdRng,
    emitted: u64,
}

impl SyntheticLineSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            emitted: 0,
        }
    }

    fn current_level(&self) -> f64 {
        if self.config.levels.is_empty() {
            return 0.0;
        }
        let per_level = self.config.samples_per_level.max(1) as u64;
        let phase = (self.emitted / per_level) as usize % self.config.levels.len();
        self.config.levels[phase]
    }

    fn next_line(&mut self) -> String {
        let level = self.current_level();
        self.emitted += 1;

        if self.config.garbage_probability > 0.0
            && self
                .rng
                .gen_bool(self.config.garbage_probability.clamp(0.0, 1.0))
        {
            return "ERR\n".to_string();
        }

        let noise = if self.config.noise_amplitude > 0.0 {
            self.rng
                .gen_range(-self.config.noise_amplitude..=self.config.noise_amplitude)
        } else {
            0.0
        };
        let value = (level + noise).round().max(0.0) as u32;
        format!("{}\n", value)
    }
}

impl LineSource for SyntheticLineSource {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        if !self.config.sample_interval.is_zero() {
            std::thread::sleep(self.config.sample_interval);
        }
        Ok(Some(self.next_line()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> SyntheticConfig {
        SyntheticConfig {
            sample_interval: Duration::ZERO,
            levels: vec![300.0, 320.0],
            samples_per_level: 3,
            noise_amplitude: 0.0,
            garbage_probability: 0.0,
            seed: Some(7),
        }
    }

    #[test]
    fn test_cycles_through_levels() {
        let mut source = SyntheticLineSource::new(quiet_config());
        let lines: Vec<String> = (0..8)
            .map(|_| source.read_line().unwrap().unwrap())
            .collect();
        assert_eq!(
            lines,
            vec!["300\n", "300\n", "300\n", "320\n", "320\n", "320\n", "300\n", "300\n"]
        );
    }

    #[test]
    fn test_noise_stays_within_amplitude() {
        let mut config = quiet_config();
        config.noise_amplitude = 2.0;
        config.levels = vec![310.0];
        let mut source = SyntheticLineSource::new(config);

        for _ in 0..500 {
            let line = source.read_line().unwrap().unwrap();
            let value: i32 = line.trim().parse().unwrap();
            assert!((308..=312).contains(&value), "value {} out of range", value);
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut config = quiet_config();
        config.noise_amplitude = 4.0;
        config.garbage_probability = 0.1;
        let mut a = SyntheticLineSource::new(config.clone());
        let mut b = SyntheticLineSource::new(config);
        for _ in 0..100 {
            assert_eq!(a.read_line().unwrap(), b.read_line().unwrap());
        }
    }

    #[test]
    fn test_garbage_lines_appear() {
        let mut config = quiet_config();
        config.garbage_probability = 1.0;
        let mut source = SyntheticLineSource::new(config);
        assert_eq!(source.read_line().unwrap(), Some("ERR\n".to_string()));
    }
}
