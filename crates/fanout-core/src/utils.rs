//! Logging with quiet control, and a stopwatch for timing runs.

use std::env;
use std::time::{Duration, Instant};

use chrono::Local;

fn is_quiet() -> bool {
    if env::var("FANOUT_QUIET")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
    {
        return true;
    }
    env::var("FANOUT_LOG")
        .map(|v| v.to_lowercase() == "quiet" || v.to_lowercase() == "error")
        .unwrap_or(false)
}

/// Timestamped line to stdout unless quiet mode is on.
pub fn log(message: &str) {
    if !is_quiet() {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        println!("[{}] {}", timestamp, message);
    }
}

pub fn log_error(message: &str) {
    eprintln!("{}", message);
}

/// Accumulating stopwatch: start/stop can repeat, reset clears.
#[derive(Default)]
pub struct StopWatch {
    started: Option<Instant>,
    accumulated: Duration,
}

impl StopWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    pub fn reset(&mut self) {
        self.started = None;
        self.accumulated = Duration::ZERO;
    }

    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self.accumulated + started.elapsed(),
            None => self.accumulated,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stopwatch_measures_elapsed_time() {
        let mut watch = StopWatch::new();
        watch.start();
        thread::sleep(Duration::from_millis(20));
        watch.stop();

        assert!(watch.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_stopwatch_accumulates_across_starts() {
        let mut watch = StopWatch::new();

        watch.start();
        thread::sleep(Duration::from_millis(10));
        watch.stop();
        let first = watch.elapsed();

        watch.start();
        thread::sleep(Duration::from_millis(10));
        watch.stop();

        assert!(watch.elapsed() >= first + Duration::from_millis(10));
    }

    #[test]
    fn test_stopwatch_reset_clears_everything() {
        let mut watch = StopWatch::new();
        watch.start();
        thread::sleep(Duration::from_millis(5));
        watch.stop();
        watch.reset();

        assert_eq!(watch.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_stopwatch_running_elapsed_grows() {
        let mut watch = StopWatch::new();
        watch.start();
        thread::sleep(Duration::from_millis(5));

        assert!(watch.elapsed() > Duration::ZERO);
    }
}
