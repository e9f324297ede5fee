use std::time::Duration;

/// How multi-channel material is folded to one channel, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvertToMono {
    /// Keep every decoded channel.
    #[default]
    Original,
    /// Average all channels into one.
    Downmix,
    /// Keep a single channel by index.
    Channel(usize),
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Target sample rate for resampling (None = keep original)
    pub target_sample_rate: Option<u32>,
    pub convert_to_mono: ConvertToMono,
    /// Maximum duration to decode (None = decode the whole stream)
    pub max_duration: Option<Duration>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = Some(rate);
        self
    }

    pub fn convert_to_mono(mut self, mode: ConvertToMono) -> Self {
        self.convert_to_mono = mode;
        self
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }
}
