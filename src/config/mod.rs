mod engine_desc;
mod play_options;

pub use engine_desc::{AudioBackend, SonoraEngineDesc};
pub use play_options::{FilterConfig, PlayOptions};
