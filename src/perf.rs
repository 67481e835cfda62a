//! Frame-rate tracking and the edge-quality fallback.
//!
//! The estimate is an exponential moving average so a single slow frame (file
//! dialog, shader compile) does not flip the quality setting.

use std::collections::VecDeque;

const SMOOTHING: f32 = 0.1;
/// Frames to observe before the estimate is trusted.
const WARMUP_FRAMES: u32 = 30;
const HISTORY_LEN: usize = 240;
/// Restore full quality only well above the threshold.
const RECOVERY_FACTOR: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityChange {
    Reduced,
    Restored,
}

#[derive(Debug, Clone)]
pub struct FrameStats {
    fps: f32,
    frames: u32,
    elapsed: f64,
    history: VecDeque<[f64; 2]>,
    low_fps_threshold: f32,
    reduced: bool,
}

impl FrameStats {
    pub fn new(low_fps_threshold: f32) -> Self {
        Self {
            fps: 0.0,
            frames: 0,
            elapsed: 0.0,
            history: VecDeque::with_capacity(HISTORY_LEN),
            low_fps_threshold,
            reduced: false,
        }
    }

    /// Feed one frame duration (seconds); reports a quality switch, if any.
    pub fn record(&mut self, dt: f32) -> Option<QualityChange> {
        if !(dt.is_finite() && dt > 0.0) {
            return None;
        }
        let instant = 1.0 / dt;
        self.fps = if self.frames == 0 {
            instant
        } else {
            self.fps + (instant - self.fps) * SMOOTHING
        };
        self.frames = self.frames.saturating_add(1);
        self.elapsed += f64::from(dt);

        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back([self.elapsed, f64::from(self.fps)]);

        if self.frames < WARMUP_FRAMES {
            return None;
        }
        if !self.reduced && self.fps < self.low_fps_threshold {
            self.reduced = true;
            log::warn!("Frame rate {:.0} fps below {:.0}; thinning edges", self.fps, self.low_fps_threshold);
            Some(QualityChange::Reduced)
        } else if self.reduced && self.fps > self.low_fps_threshold * RECOVERY_FACTOR {
            self.reduced = false;
            log::info!("Frame rate recovered to {:.0} fps; full edge width", self.fps);
            Some(QualityChange::Restored)
        } else {
            None
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn is_reduced(&self) -> bool {
        self.reduced
    }

    /// `[seconds, fps]` pairs for plotting.
    pub fn history(&self) -> Vec<[f64; 2]> {
        self.history.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(stats: &mut FrameStats, fps: f32, frames: u32) -> Vec<QualityChange> {
        (0..frames).filter_map(|_| stats.record(1.0 / fps)).collect()
    }

    #[test]
    fn test_fps_estimate_converges() {
        let mut stats = FrameStats::new(30.0);
        feed(&mut stats, 60.0, 100);
        assert!((stats.fps() - 60.0).abs() < 0.5);
        assert!(!stats.is_reduced());
    }

    #[test]
    fn test_slow_frames_reduce_once() {
        let mut stats = FrameStats::new(30.0);
        feed(&mut stats, 60.0, 40);
        let changes = feed(&mut stats, 15.0, 100);
        assert_eq!(changes, vec![QualityChange::Reduced]);
        assert!(stats.is_reduced());
    }

    #[test]
    fn test_no_decision_during_warmup() {
        let mut stats = FrameStats::new(30.0);
        assert!(feed(&mut stats, 10.0, WARMUP_FRAMES - 1).is_empty());
        assert!(!stats.is_reduced());
    }

    #[test]
    fn test_recovery_needs_headroom() {
        let mut stats = FrameStats::new(30.0);
        feed(&mut stats, 15.0, 60);
        assert!(stats.is_reduced());
        // above threshold but inside the hysteresis band
        assert!(feed(&mut stats, 40.0, 200).is_empty());
        assert_eq!(feed(&mut stats, 60.0, 200), vec![QualityChange::Restored]);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut stats = FrameStats::new(30.0);
        feed(&mut stats, 60.0, 1000);
        let history = stats.history();
        assert_eq!(history.len(), HISTORY_LEN);
        assert!(history.windows(2).all(|w| w[0][0] < w[1][0]));
    }

    #[test]
    fn test_ignores_bad_durations() {
        let mut stats = FrameStats::new(30.0);
        assert!(stats.record(0.0).is_none());
        assert!(stats.record(f32::NAN).is_none());
        assert_eq!(stats.fps(), 0.0);
        assert!(stats.history().is_empty());
    }
}
