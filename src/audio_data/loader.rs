use crate::audio_data::{LoadOptions, SonoraAudioData};
use crate::error::Result;

/// Trait for fetching and decoding a sound from its catalog source.
///
/// The engine runs loaders on worker threads, one per catalog entry, so
/// implementations must be `Send + Sync`. Any error (or panic) makes the
/// engine substitute a synthesized sound for that entry.
///
/// # Example
///
/// ```ignore
/// use sonora::audio_data::{AudioDataLoader, LoadOptions, SonoraAudioData};
/// use sonora::error::Result;
///
/// struct EmbeddedLoader;
///
/// impl AudioDataLoader for EmbeddedLoader {
///     fn load(&self, source: &str, options: &LoadOptions) -> Result<SonoraAudioData> {
///         // look the bytes up in an embedded asset table and decode them
///         todo!()
///     }
/// }
/// ```
pub trait AudioDataLoader: Send + Sync {
    /// Loads audio from a URL or file path.
    fn load(&self, source: &str, options: &LoadOptions) -> Result<SonoraAudioData>;
}
