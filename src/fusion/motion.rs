// Presence Tag — Motion Smoother & Hysteresis Classifier
//
// Linear-acceleration magnitudes feed a fixed ring buffer with a running sum
// (simple moving average).  The average drives a two-threshold state machine
// that only reports transitions.

use crate::events::MotionState;

/// Fixed-capacity ring of magnitudes with an O(1) running sum.
///
/// Slots start at zero, so the average over a partially filled ring counts
/// the missing samples as zero.  Non-finite values are refused before they
/// can reach the sum.
#[derive(Debug, Clone)]
pub struct MotionBuffer {
    slots: Box<[f32]>,
    write_index: usize,
    len: usize,
    sum: f32,
}

impl MotionBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "motion buffer capacity must be non-zero");
        Self {
            slots: vec![0.0; capacity].into_boxed_slice(),
            write_index: 0,
            len: 0,
            sum: 0.0,
        }
    }

    /// Insert `value`, evicting the oldest slot.  Returns `false` (and leaves
    /// the buffer untouched) for NaN or infinite input.
    pub fn push(&mut self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }

        let slot = &mut self.slots[self.write_index];
        self.sum -= *slot;
        *slot = value;
        self.sum += value;

        self.write_index = (self.write_index + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());

        // Resync once per lap so float rounding cannot accumulate.
        if self.write_index == 0 {
            self.sum = self.slots.iter().sum();
        }
        true
    }

    pub fn sum(&self) -> f32 {
        self.sum
    }

    pub fn average(&self) -> f32 {
        self.sum / self.slots.len() as f32
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of samples inserted so far, saturating at capacity.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }
}

/// Two-state hysteresis on the moving average.
#[derive(Debug, Clone)]
pub struct MotionClassifier {
    state: MotionState,
    enter_threshold: f32,
    exit_threshold: f32,
}

impl MotionClassifier {
    pub fn new(enter_threshold: f32, exit_threshold: f32) -> Self {
        debug_assert!(exit_threshold < enter_threshold);
        Self {
            state: MotionState::NotMoving,
            enter_threshold,
            exit_threshold,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Feed one average; returns the new state only when it changed.
    pub fn update(&mut self, average: f32) -> Option<MotionState> {
        let next = match self.state {
            MotionState::NotMoving if average >= self.enter_threshold => MotionState::Moving,
            MotionState::Moving if average <= self.exit_threshold => MotionState::NotMoving,
            current => current,
        };

        if next == self.state {
            None
        } else {
            self.state = next;
            Some(next)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionUpdate {
    pub average: f32,
    pub transition: Option<MotionState>,
}

/// Buffer and classifier chained together.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    buffer: MotionBuffer,
    classifier: MotionClassifier,
}

impl MotionDetector {
    pub fn new(capacity: usize, enter_threshold: f32, exit_threshold: f32) -> Self {
        Self {
            buffer: MotionBuffer::new(capacity),
            classifier: MotionClassifier::new(enter_threshold, exit_threshold),
        }
    }

    /// `None` when the magnitude was rejected as non-finite.
    pub fn push(&mut self, magnitude: f32) -> Option<MotionUpdate> {
        if !self.buffer.push(magnitude) {
            return None;
        }
        let average = self.buffer.average();
        Some(MotionUpdate {
            average,
            transition: self.classifier.update(average),
        })
    }

    pub fn state(&self) -> MotionState {
        self.classifier.state()
    }

    pub fn buffer(&self) -> &MotionBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Small deterministic generator so the long-run test is reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next_f32(&mut self) -> f32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 40) as f32 / (1u64 << 24) as f32
        }
    }

    #[test]
    fn running_sum_matches_window_over_long_run() {
        let mut buffer = MotionBuffer::new(32);
        let mut window: VecDeque<f64> = VecDeque::new();
        let mut rng = Lcg(0x5eed);

        for i in 0..20_000 {
            // Mix quiet and vigorous stretches to stress cancellation.
            let scale = if (i / 500) % 2 == 0 { 0.02 } else { 3.0 };
            let v = rng.next_f32() * scale;
            assert!(buffer.push(v));

            window.push_back(v as f64);
            if window.len() > 32 {
                window.pop_front();
            }
            let exact: f64 = window.iter().sum();
            assert!(
                (buffer.sum() as f64 - exact).abs() < 1e-3,
                "iteration {}: running sum {} drifted from {}",
                i,
                buffer.sum(),
                exact
            );
        }
    }

    #[test]
    fn first_lap_does_not_over_subtract() {
        let mut buffer = MotionBuffer::new(4);
        buffer.push(1.0);
        buffer.push(2.0);
        assert_eq!(buffer.sum(), 3.0);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.average(), 0.75);
        assert!(!buffer.is_full());
    }

    #[test]
    fn oldest_value_is_evicted() {
        let mut buffer = MotionBuffer::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            buffer.push(v);
        }
        assert_eq!(buffer.sum(), 9.0);
        assert!(buffer.is_full());
    }

    #[test]
    fn non_finite_input_is_refused() {
        let mut buffer = MotionBuffer::new(4);
        buffer.push(1.0);
        assert!(!buffer.push(f32::NAN));
        assert!(!buffer.push(f32::INFINITY));
        assert_eq!(buffer.sum(), 1.0);
        assert_eq!(buffer.len(), 1);

        buffer.push(1.0);
        assert!(buffer.sum().is_finite());
    }

    #[test]
    fn hysteresis_band_does_not_chatter() {
        let mut classifier = MotionClassifier::new(0.5, 0.05);
        assert_eq!(classifier.update(0.5), Some(MotionState::Moving));

        for i in 0..1000 {
            let avg = 0.051 + 0.448 * ((i % 7) as f32 / 6.0);
            assert_eq!(classifier.update(avg), None);
            assert_eq!(classifier.state(), MotionState::Moving);
        }

        assert_eq!(classifier.update(0.05), Some(MotionState::NotMoving));
        for i in 0..1000 {
            let avg = 0.051 + 0.448 * ((i % 5) as f32 / 4.0);
            assert_eq!(classifier.update(avg), None);
        }
    }

    #[test]
    fn nan_average_causes_no_transition() {
        let mut classifier = MotionClassifier::new(0.25, 0.05);
        assert_eq!(classifier.update(f32::NAN), None);
        assert_eq!(classifier.state(), MotionState::NotMoving);
    }

    #[test]
    fn sustained_motion_enters_once() {
        let mut detector = MotionDetector::new(32, 0.5, 0.05);
        for _ in 0..40 {
            assert_eq!(detector.push(0.0).unwrap().transition, None);
        }

        let mut events = Vec::new();
        for n in 1..=20 {
            let update = detector.push(1.0).unwrap();
            if let Some(state) = update.transition {
                events.push((n, state));
            }
        }
        assert_eq!(events, vec![(16, MotionState::Moving)]);
        assert_eq!(detector.state(), MotionState::Moving);
    }

    #[test]
    fn stillness_exits_once() {
        let mut detector = MotionDetector::new(32, 0.5, 0.05);
        for _ in 0..20 {
            detector.push(1.0);
        }
        assert_eq!(detector.state(), MotionState::Moving);

        let mut events = Vec::new();
        let mut last_avg = f32::MAX;
        for _ in 0..40 {
            let update = detector.push(0.0).unwrap();
            last_avg = update.average;
            events.extend(update.transition);
        }
        assert_eq!(events, vec![MotionState::NotMoving]);
        assert_eq!(last_avg, 0.0);
    }

    #[test]
    fn lower_enter_threshold_is_more_sensitive() {
        let mut detector = MotionDetector::new(32, 0.25, 0.05);
        let mut entered_at = None;
        for n in 1..=20 {
            if detector.push(1.0).unwrap().transition == Some(MotionState::Moving) {
                entered_at = Some(n);
            }
        }
        assert_eq!(entered_at, Some(8));
    }
}
