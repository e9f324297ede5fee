use crate::catalog::{SoundSpec, default_catalog};
use crate::error::{Result, SonoraError};
use crate::nodes::PanningModel;

/// Where rendered audio goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBackend {
    /// Default output device through cpal, rendered on a dedicated thread
    Device,
    /// No device; the caller pulls audio with `SonoraEngine::render_offline`
    Offline,
    /// Audio processing unavailable; the engine starts in degraded mode
    Disabled,
}

/// Configuration descriptor for a Sonora engine
#[derive(Debug, Clone)]
pub struct SonoraEngineDesc {
    /// Sample rate of the processing context. Loaded sounds are resampled to it.
    pub sample_rate: u32,
    /// Frames rendered per processing block. Must be a power of two.
    pub block_size: usize,
    /// Number of device output channels (the graph itself is stereo)
    pub channels: u16,
    pub backend: AudioBackend,
    /// Whether pointer-driven 3D positioning is offered at all
    pub enable_spatialization: bool,
    pub panning_model: PanningModel,
    /// Optional path to a custom HRTF SOFA file (None uses Steam Audio's default HRTF)
    pub hrtf_path: Option<String>,
    /// Master volume at startup
    pub initial_volume: f32,
    /// Width and height of the pointer coordinate space
    pub viewport: (f32, f32),
    pub catalog: Vec<SoundSpec>,
    /// Rendered blocks buffered between the render thread and the device callback
    pub buffer_blocks: usize,
}

impl Default for SonoraEngineDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            channels: 2,
            backend: AudioBackend::Device,
            enable_spatialization: true,
            panning_model: PanningModel::Hrtf,
            hrtf_path: None,
            initial_volume: 0.5,
            viewport: (1920.0, 1080.0),
            catalog: default_catalog(),
            buffer_blocks: 4,
        }
    }
}

impl SonoraEngineDesc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for rendering without an output device.
    pub fn offline() -> Self {
        Self::default().backend(AudioBackend::Offline)
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn backend(mut self, backend: AudioBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn enable_spatialization(mut self, enable: bool) -> Self {
        self.enable_spatialization = enable;
        self
    }

    pub fn panning_model(mut self, model: PanningModel) -> Self {
        self.panning_model = model;
        self
    }

    pub fn hrtf_path(mut self, path: impl Into<String>) -> Self {
        self.hrtf_path = Some(path.into());
        self
    }

    pub fn initial_volume(mut self, volume: f32) -> Self {
        self.initial_volume = volume;
        self
    }

    pub fn viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn catalog(mut self, catalog: Vec<SoundSpec>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn buffer_blocks(mut self, blocks: usize) -> Self {
        self.buffer_blocks = blocks;
        self
    }

    /// Checks the values a processing context cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if !(3000..=768_000).contains(&self.sample_rate) {
            return Err(SonoraError::Configuration(format!(
                "Sample rate {} Hz is outside 3000..=768000",
                self.sample_rate
            )));
        }
        if !self.block_size.is_power_of_two() || !(32..=8192).contains(&self.block_size) {
            return Err(SonoraError::Configuration(format!(
                "Block size {} must be a power of two between 32 and 8192",
                self.block_size
            )));
        }
        if self.channels == 0 {
            return Err(SonoraError::Configuration(
                "Channel count must be greater than 0".to_string(),
            ));
        }
        if self.buffer_blocks < 2 {
            return Err(SonoraError::Configuration(
                "At least two buffered blocks are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_desc_is_valid() {
        assert!(SonoraEngineDesc::default().validate().is_ok());
        assert_eq!(SonoraEngineDesc::offline().backend, AudioBackend::Offline);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SonoraEngineDesc::new().sample_rate(0).validate().is_err());
        assert!(SonoraEngineDesc::new().block_size(500).validate().is_err());
        assert!(SonoraEngineDesc::new().channels(0).validate().is_err());
        assert!(SonoraEngineDesc::new().buffer_blocks(1).validate().is_err());
    }
}
