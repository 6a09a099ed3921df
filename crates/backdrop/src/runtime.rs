use std::time::Instant;

use crate::types::{CanvasConfig, ClockMode};

/// Reference refresh rate used to convert a per-frame step into a wall-clock rate.
const REFERENCE_HZ: f64 = 60.0;

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Value written into the `time` uniform.
    pub seconds: f32,
    /// Monotonic frame counter for the running canvas.
    pub frame_index: u64,
}

impl TimeSample {
    /// Creates a new time sample.
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Advances by a fixed step per sample, independent of the display's refresh rate.
///
/// Accumulation happens in `f64` so long sessions do not drift; the exposed
/// `f32` never decreases.
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimeSource {
    initial: f64,
    step: f64,
    frame: u64,
}

impl SteppedTimeSource {
    pub fn new(initial: f32, step: f32) -> Self {
        Self {
            initial: f64::from(initial),
            step: f64::from(step),
            frame: 0,
        }
    }
}

impl TimeSource for SteppedTimeSource {
    fn sample(&mut self) -> TimeSample {
        self.frame = self.frame.saturating_add(1);
        let seconds = self.initial + self.step * self.frame as f64;
        TimeSample::new(seconds as f32, self.frame - 1)
    }
}

/// Time source backed by the system monotonic clock.
///
/// Runs at the same perceived speed as [`SteppedTimeSource`] on a 60 Hz display.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    initial: f64,
    rate: f64,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new(initial: f32, step: f32) -> Self {
        Self {
            origin: Instant::now(),
            initial: f64::from(initial),
            rate: f64::from(step) * REFERENCE_HZ,
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed().as_secs_f64();
        let sample = TimeSample::new((self.initial + elapsed * self.rate) as f32, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Builds the time source requested by the canvas configuration.
pub fn time_source_for_config(config: &CanvasConfig) -> BoxedTimeSource {
    match config.clock {
        ClockMode::Stepped => Box::new(SteppedTimeSource::new(config.initial_time, config.step)),
        ClockMode::WallClock => Box::new(SystemTimeSource::new(config.initial_time, config.step)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_source_adds_fixed_step_per_sample() {
        let mut source = SteppedTimeSource::new(1.0, 0.05);
        let first = source.sample();
        let second = source.sample();
        assert!((first.seconds - 1.05).abs() < 1e-6);
        assert!((second.seconds - first.seconds - 0.05).abs() < 1e-5);
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
    }

    #[test]
    fn stepped_source_never_decreases_over_long_runs() {
        let mut source = SteppedTimeSource::new(1.0, 0.05);
        let mut last = f32::MIN;
        for _ in 0..200_000 {
            let sample = source.sample();
            assert!(sample.seconds >= last);
            last = sample.seconds;
        }
        assert!((last - 10_001.0).abs() < 0.01);
    }

    #[test]
    fn wall_clock_source_starts_near_initial_time() {
        let mut source = SystemTimeSource::new(1.0, 0.05);
        let sample = source.sample();
        assert!(sample.seconds >= 1.0);
        assert!(sample.seconds < 2.0);
    }

    #[test]
    fn config_selects_clock_mode() {
        let config = CanvasConfig {
            clock: ClockMode::Stepped,
            initial_time: 0.0,
            step: 1.0,
            ..CanvasConfig::default()
        };
        let mut source = time_source_for_config(&config);
        assert_eq!(source.sample().seconds, 1.0);
        assert_eq!(source.sample().seconds, 2.0);
    }
}
