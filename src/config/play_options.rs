use crate::effects::EffectKind;
use crate::nodes::FilterType;

/// Settings of a per-chain biquad filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    pub filter_type: FilterType,
    /// Cutoff or center frequency in Hz
    pub frequency: f32,
    pub q: f32,
    /// Gain in dB, used by the shelf and peaking types
    pub gain: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_type: FilterType::Lowpass,
            frequency: 20000.0,
            q: 1.0,
            gain: 0.0,
        }
    }
}

impl FilterConfig {
    pub fn new(filter_type: FilterType, frequency: f32) -> Self {
        Self {
            filter_type,
            frequency,
            ..Default::default()
        }
    }

    pub fn q(mut self, q: f32) -> Self {
        self.q = q;
        self
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }
}

/// Per-playback options accepted by `play` and `play_spatial`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayOptions {
    /// Instance volume in [0, 1] (None = 1.0)
    pub volume: Option<f32>,
    pub playback_rate: Option<f32>,
    /// Absolute context time to start at (None = now)
    pub when: Option<f64>,
    /// Seconds into the buffer to start from
    pub offset: Option<f64>,
    /// Shared effect units to route through, in order
    pub effects: Vec<EffectKind>,
    pub filter: Option<FilterConfig>,
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn playback_rate(mut self, rate: f32) -> Self {
        self.playback_rate = Some(rate);
        self
    }

    pub fn when(mut self, when: f64) -> Self {
        self.when = Some(when);
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn effect(mut self, effect: EffectKind) -> Self {
        self.effects.push(effect);
        self
    }

    /// Appends effects by name. Unknown names are skipped.
    pub fn effects_by_name<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            match EffectKind::from_name(name) {
                Some(kind) => self.effects.push(kind),
                None => log::warn!("Unknown effect '{}' ignored", name),
            }
        }
        self
    }

    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Instance volume clamped to [0, 1].
    pub(crate) fn effective_volume(&self) -> f32 {
        self.volume.unwrap_or(1.0).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_defaults_to_unity_and_clamps() {
        assert_eq!(PlayOptions::new().effective_volume(), 1.0);
        assert_eq!(PlayOptions::new().volume(0.0).effective_volume(), 0.0);
        assert_eq!(PlayOptions::new().volume(3.0).effective_volume(), 1.0);
    }

    #[test]
    fn effects_by_name_keeps_order_and_skips_unknown() {
        let options = PlayOptions::new().effects_by_name(["delay", "flanger", "reverb"]);
        assert_eq!(options.effects, vec![EffectKind::Delay, EffectKind::Reverb]);
    }
}
