use crate::error::{Result, SonoraError};
use audionimbus::{AudioSettings, Context, ContextSettings, Hrtf, HrtfSettings, Sofa, VolumeNormalization};

/// Steam Audio objects shared by every HRTF panner of one renderer.
pub struct HrtfContext {
    pub(crate) context: Context,
    pub(crate) hrtf: Hrtf,
    pub(crate) sample_rate: u32,
    pub(crate) frame_size: usize,
}

impl HrtfContext {
    /// Creates the Steam Audio context and loads an HRTF, either Steam
    /// Audio's built-in one or a SOFA file from `hrtf_path`.
    pub fn new(sample_rate: u32, frame_size: usize, hrtf_path: Option<&str>) -> Result<Self> {
        log::info!(
            "Initializing Steam Audio HRTF (sample_rate: {} Hz, frame_size: {})",
            sample_rate,
            frame_size
        );

        let context = Context::try_new(&ContextSettings::default()).map_err(|e| {
            SonoraError::SpatialAudio(format!("Failed to create Steam Audio context: {}", e))
        })?;

        let audio_settings = AudioSettings {
            sampling_rate: sample_rate,
            frame_size: frame_size as u32,
        };

        let hrtf = match hrtf_path {
            Some(path) => create_hrtf_from_file(&context, &audio_settings, path)?,
            None => create_default_hrtf(&context, &audio_settings)?,
        };

        Ok(Self {
            context,
            hrtf,
            sample_rate,
            frame_size,
        })
    }

    pub(crate) fn audio_settings(&self) -> AudioSettings {
        AudioSettings {
            sampling_rate: self.sample_rate,
            frame_size: self.frame_size as u32,
        }
    }
}

/// Load HRTF with default settings
pub fn create_default_hrtf(context: &Context, audio_settings: &AudioSettings) -> Result<Hrtf> {
    let hrtf = Hrtf::try_new(
        context,
        audio_settings,
        &HrtfSettings {
            volume_normalization: VolumeNormalization::None,
            sofa_information: None,
            ..Default::default()
        },
    )
    .map_err(|e| SonoraError::SpatialAudio(format!("Failed to create HRTF: {}", e)))?;

    log::info!("Created default HRTF");
    Ok(hrtf)
}

/// Load HRTF from a custom SOFA file
pub fn create_hrtf_from_file(
    context: &Context,
    audio_settings: &AudioSettings,
    sofa_path: &str,
) -> Result<Hrtf> {
    let hrtf_data = std::fs::read(sofa_path)
        .map_err(|e| SonoraError::SpatialAudio(format!("Failed to read HRTF file: {}", e)))?;

    let hrtf = Hrtf::try_new(
        context,
        audio_settings,
        &HrtfSettings {
            volume_normalization: VolumeNormalization::None,
            sofa_information: Some(Sofa::Buffer(hrtf_data)),
            ..Default::default()
        },
    )
    .map_err(|e| SonoraError::SpatialAudio(format!("Failed to create HRTF from file: {}", e)))?;

    log::info!("Created HRTF from file: {}", sofa_path);
    Ok(hrtf)
}
