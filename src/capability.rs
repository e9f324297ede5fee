//! What the engine managed to set up at startup.

use crate::config::{AudioBackend, SonoraEngineDesc};
use std::fmt;

/// Overall operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Processing graph, effects and visualization are available
    Full,
    /// No processing context; only direct fallback playback works
    Degraded,
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Degraded => f.write_str("degraded"),
        }
    }
}

/// Result of capability negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub mode: EngineMode,
    /// Pointer-driven 3D positioning is available
    pub spatial: bool,
}

impl Capabilities {
    pub fn full(spatial: bool) -> Self {
        Self {
            mode: EngineMode::Full,
            spatial,
        }
    }

    pub fn degraded() -> Self {
        Self {
            mode: EngineMode::Degraded,
            spatial: false,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.mode == EngineMode::Degraded
    }

    /// Capabilities a descriptor asks for, before the context is built.
    pub(crate) fn requested(desc: &SonoraEngineDesc) -> Self {
        if desc.backend == AudioBackend::Disabled {
            return Self::degraded();
        }
        Self::full(desc.enable_spatialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_backend_requests_degraded_mode() {
        let desc = SonoraEngineDesc::offline().backend(AudioBackend::Disabled);
        assert_eq!(Capabilities::requested(&desc), Capabilities::degraded());
    }

    #[test]
    fn spatial_follows_descriptor() {
        let desc = SonoraEngineDesc::offline().enable_spatialization(false);
        let caps = Capabilities::requested(&desc);
        assert_eq!(caps.mode, EngineMode::Full);
        assert!(!caps.spatial);
        assert!(!Capabilities::degraded().spatial);
    }
}
