use std::time::{Duration, SystemTime};

use crate::session::{SessionState, TypingSession};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub t: f64,
    pub wpm: f64,
}

impl TimeSeriesPoint {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

impl From<TimeSeriesPoint> for (f64, f64) {
    fn from(p: TimeSeriesPoint) -> Self {
        (p.t, p.wpm)
    }
}

/// Live WPM sampled at most once per `interval` while a session is active.
#[derive(Debug, Clone)]
pub struct WpmSampler {
    interval: Duration,
    points: Vec<TimeSeriesPoint>,
}

impl WpmSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            points: Vec::new(),
        }
    }

    /// Records a point if the session is active and a full interval has passed.
    pub fn sample(&mut self, session: &TypingSession, now: SystemTime) {
        if session.state() != SessionState::Active {
            return;
        }
        let Some(elapsed) = session.elapsed_at(now) else {
            return;
        };
        let t = elapsed.as_secs_f64();
        let due = self
            .points
            .last()
            .map_or(t >= self.interval.as_secs_f64(), |last| {
                t - last.t >= self.interval.as_secs_f64()
            });
        if due {
            self.points
                .push(TimeSeriesPoint::new(t, f64::from(session.live_wpm_at(now))));
        }
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl Default for WpmSampler {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000) + Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_samples_only_while_active() {
        let mut sampler = WpmSampler::default();
        let mut session = TypingSession::with_target("hello world");
        sampler.sample(&session, at(5.0));
        assert!(sampler.points().is_empty());

        session.on_input_at("h", at(0.0));
        sampler.sample(&session, at(0.5));
        assert!(sampler.points().is_empty());
        sampler.sample(&session, at(1.0));
        sampler.sample(&session, at(1.5));
        sampler.sample(&session, at(2.0));
        let ts: Vec<f64> = sampler.points().iter().map(|p| p.t).collect();
        assert_eq!(ts, vec![1.0, 2.0]);
    }

    #[test]
    fn test_stops_after_finish() {
        let mut sampler = WpmSampler::default();
        let mut session = TypingSession::with_target("hi");
        session.on_input_at("h", at(0.0));
        session.on_input_at("hi", at(1.0));
        sampler.sample(&session, at(3.0));
        assert!(sampler.points().is_empty());
    }

    #[test]
    fn test_point_converts_to_tuple() {
        let tuple: (f64, f64) = TimeSeriesPoint::new(1.5, 42.0).into();
        assert_eq!(tuple, (1.5, 42.0));
    }
}
