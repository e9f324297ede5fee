/// An automatable node parameter.
///
/// Holds a current value plus at most one pending linear ramp. Scheduling a
/// new ramp starts it from the value the parameter has at the moment of
/// scheduling.
#[derive(Debug, Clone)]
pub struct AudioParam {
    value: f32,
    min: f32,
    max: f32,
    ramp: Option<LinearRamp>,
}

#[derive(Debug, Clone, Copy)]
struct LinearRamp {
    start_value: f32,
    start_time: f64,
    target: f32,
    end_time: f64,
}

impl AudioParam {
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        Self {
            value: value.clamp(min, max),
            min,
            max,
            ramp: None,
        }
    }

    /// Current value, ignoring any ramp that has not been rendered yet.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Sets the value immediately and cancels a pending ramp.
    pub fn set_value(&mut self, value: f32) {
        self.value = value.clamp(self.min, self.max);
        self.ramp = None;
    }

    /// Ramps linearly from the current value at `now` to `target` at `end_time`.
    pub fn linear_ramp_to_value_at_time(&mut self, target: f32, now: f64, end_time: f64) {
        let target = target.clamp(self.min, self.max);
        if end_time <= now {
            self.set_value(target);
            return;
        }
        self.ramp = Some(LinearRamp {
            start_value: self.value,
            start_time: now,
            target,
            end_time,
        });
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }

    /// Value at context time `time`, advancing the current value.
    ///
    /// Must be called with non-decreasing times.
    pub fn value_at(&mut self, time: f64) -> f32 {
        if let Some(ramp) = self.ramp {
            if time >= ramp.end_time {
                self.value = ramp.target;
                self.ramp = None;
            } else if time > ramp.start_time {
                let progress = ((time - ramp.start_time) / (ramp.end_time - ramp.start_time)) as f32;
                self.value = ramp.start_value + (ramp.target - ramp.start_value) * progress;
            }
        }
        self.value
    }
}
