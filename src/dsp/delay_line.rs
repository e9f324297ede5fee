/// Circular delay buffer with fractional (linearly interpolated) reads.
///
/// Reads happen before the current sample is pushed: `read(d)` returns the
/// sample pushed `d` pushes ago.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write: usize,
}

impl DelayLine {
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(1) + 2],
            write: 0,
        }
    }

    /// Longest delay, in samples, a read can reach.
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 2) as f32
    }

    pub fn read(&self, delay_samples: f32) -> f32 {
        let delay = delay_samples.clamp(1.0, self.max_delay());
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;
        let newer = self.at(whole);
        if frac == 0.0 {
            return newer;
        }
        let older = self.at(whole + 1);
        newer + (older - newer) * frac
    }

    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write] = sample;
        self.write = (self.write + 1) % self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
    }

    fn at(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        self.buffer[(self.write + len - delay % len) % len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_delay() {
        let mut line = DelayLine::new(8);
        for i in 0..5 {
            line.push(i as f32);
        }
        assert_eq!(line.read(1.0), 4.0);
        assert_eq!(line.read(3.0), 2.0);
    }

    #[test]
    fn fractional_delay_interpolates() {
        let mut line = DelayLine::new(8);
        line.push(0.0);
        line.push(1.0);
        assert!((line.read(1.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn delay_is_clamped_to_capacity() {
        let mut line = DelayLine::new(4);
        for i in 0..10 {
            line.push(i as f32);
        }
        assert_eq!(line.read(100.0), line.read(4.0));
        assert_eq!(line.read(0.0), 9.0);
    }
}
