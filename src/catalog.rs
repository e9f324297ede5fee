//! The fixed catalog of named sounds the engine loads at startup.

use std::fmt;

/// Category tag of a sound. Drives synthetic fallback generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    Interface,
    System,
    Feedback,
    Ambient,
    /// Any tag the engine does not know about
    Other,
}

impl SoundCategory {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "interface" => Self::Interface,
            "system" => Self::System,
            "feedback" => Self::Feedback,
            "ambient" => Self::Ambient,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::System => "system",
            Self::Feedback => "feedback",
            Self::Ambient => "ambient",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry: where to fetch a sound and how to treat it.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSpec {
    pub name: String,
    /// `http(s)://` URL or a local file path
    pub source: String,
    pub category: SoundCategory,
    pub looping: bool,
}

impl SoundSpec {
    pub fn new(name: impl Into<String>, source: impl Into<String>, category: SoundCategory) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            category,
            looping: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

const SFX_BASE: &str = "https://assets.mixkit.co/sfx/preview";
const MUSIC_BASE: &str = "https://assets.mixkit.co/music/preview";

/// The site's sound library.
pub fn default_catalog() -> Vec<SoundSpec> {
    use SoundCategory::*;

    vec![
        SoundSpec::new("click", format!("{SFX_BASE}/mixkit-select-click-1109.mp3"), Interface),
        SoundSpec::new(
            "hover",
            format!("{SFX_BASE}/mixkit-hover-sci-fi-mouse-902.mp3"),
            Interface,
        ),
        SoundSpec::new(
            "activate",
            format!("{SFX_BASE}/mixkit-unlock-game-notification-253.mp3"),
            System,
        ),
        SoundSpec::new(
            "success",
            format!("{SFX_BASE}/mixkit-winning-chimes-2015.mp3"),
            Feedback,
        ),
        SoundSpec::new(
            "error",
            format!("{SFX_BASE}/mixkit-wrong-answer-fail-notification-946.mp3"),
            Feedback,
        ),
        SoundSpec::new(
            "ambient_neural",
            format!("{MUSIC_BASE}/mixkit-tech-house-vibes-130.mp3"),
            Ambient,
        )
        .looping(true),
        SoundSpec::new(
            "ambient_quantum",
            format!("{MUSIC_BASE}/mixkit-deep-urban-623.mp3"),
            Ambient,
        )
        .looping(true),
        SoundSpec::new(
            "ambient_matrix",
            format!("{MUSIC_BASE}/mixkit-futuristic-robotic-303.mp3"),
            Ambient,
        )
        .looping(true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique() {
        let catalog = default_catalog();
        let names: HashSet<_> = catalog.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn only_ambient_entries_loop() {
        for spec in default_catalog() {
            assert_eq!(spec.looping, spec.category == SoundCategory::Ambient, "{}", spec.name);
        }
    }

    #[test]
    fn unknown_tags_map_to_other() {
        assert_eq!(SoundCategory::from_tag("ambient"), SoundCategory::Ambient);
        assert_eq!(SoundCategory::from_tag("music"), SoundCategory::Other);
    }
}
