//! Fixed-step linear interpolation of channel levels
//!
//! Every channel carries two independent segments, one for the bar value
//! and one for the peak marker. A tick moves every segment by
//! `(target - start) / steps`. After `steps` ticks the segment collapses
//! onto its target, so the next tick computes a zero increment everywhere
//! and reports that nothing moved.

/// Interpolation span for one series of one channel
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Segment {
    pub start: f32,
    pub current: f32,
    pub target: f32,
}

impl Segment {
    /// A segment at rest on `value`
    fn at(value: f32) -> Self {
        Self {
            start: value,
            current: value,
            target: value,
        }
    }

    fn increment(&self, steps: u32) -> f32 {
        (self.target - self.start) / steps as f32
    }

    /// Aim at a new target starting from wherever the segment currently is
    fn retarget(&mut self, target: f32) {
        self.start = self.current;
        self.target = target;
    }

    fn finish(&mut self) {
        self.current = self.target;
        self.start = self.target;
    }
}

/// Animation state of one channel
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelState {
    pub bar: Segment,
    pub peak: Segment,
}

/// Per-channel interpolation driven one tick at a time
#[derive(Clone, Debug)]
pub struct Animator {
    channels: Vec<ChannelState>,
    steps: u32,
    /// Ticks applied to the current segment
    elapsed: u32,
}

impl Animator {
    pub fn new(steps: u32) -> Self {
        Self {
            channels: Vec::new(),
            steps: steps.max(1),
            elapsed: 0,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[ChannelState] {
        &self.channels
    }

    /// Jump straight to the given levels, replacing the channel layout
    pub fn snap(&mut self, values: &[f32], peaks: &[f32]) {
        self.channels = values
            .iter()
            .zip(peaks)
            .map(|(&value, &peak)| ChannelState {
                bar: Segment::at(value),
                peak: Segment::at(peak),
            })
            .collect();
        self.elapsed = 0;
    }

    /// Start a new segment from the displayed levels toward the given ones
    ///
    /// The channel count must match the current layout.
    pub fn retarget(&mut self, values: &[f32], peaks: &[f32]) {
        debug_assert_eq!(values.len(), self.channels.len());
        debug_assert_eq!(peaks.len(), self.channels.len());

        for (channel, (&value, &peak)) in self.channels.iter_mut().zip(values.iter().zip(peaks)) {
            channel.bar.retarget(value);
            channel.peak.retarget(peak);
        }
        self.elapsed = 0;
    }

    /// Advance every segment by one step
    ///
    /// # Returns
    /// `true` if at least one increment was non-zero
    pub fn tick(&mut self) -> bool {
        let steps = self.steps;
        let k = (self.elapsed + 1) as f32;
        let mut moved = false;

        for channel in &mut self.channels {
            for segment in [&mut channel.bar, &mut channel.peak] {
                let increment = segment.increment(steps);
                if increment != 0.0 {
                    moved = true;
                    // Computed from `start` rather than accumulated, so no drift
                    segment.current = segment.start + increment * k;
                }
            }
        }

        if !moved {
            self.settle();
            return false;
        }

        self.elapsed += 1;
        if self.elapsed >= steps {
            self.settle();
        }
        true
    }

    fn settle(&mut self) {
        for channel in &mut self.channels {
            channel.bar.finish();
            channel.peak.finish();
        }
        self.elapsed = 0;
    }
}
