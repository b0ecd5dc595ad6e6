use instant::Instant;

/// Source of animation time in seconds.
pub trait Clock {
    fn now(&self) -> f32;

    /// Restart at zero.
    fn reset(&mut self);
}

/// Wall clock measured from construction or the last reset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    fn reset(&mut self) {
        self.start = Instant::now();
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualClock {
    time: f32,
}

impl ManualClock {
    pub fn new(time: f32) -> Self {
        Self { time }
    }

    pub fn set(&mut self, time: f32) {
        self.time = time;
    }

    pub fn advance(&mut self, seconds: f32) {
        self.time += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f32 {
        self.time
    }

    fn reset(&mut self) {
        self.time = 0.0;
    }
}
