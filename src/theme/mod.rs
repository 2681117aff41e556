pub mod palette;
pub mod remote;
pub mod state;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use palette::{css_variables, font_link, Palette};
pub use remote::SettingsRemote;
pub use state::{Appearance, AppearanceHook, ThemeState};
pub use storage::{FileStorage, LocalStorage, MemoryStorage};

/// The five visual themes a visitor can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    Minimal,
    #[default]
    Modern,
    Aesthetic,
    Professional,
    Academic,
}

impl ThemeId {
    pub const ALL: [ThemeId; 5] = [
        ThemeId::Minimal,
        ThemeId::Modern,
        ThemeId::Aesthetic,
        ThemeId::Professional,
        ThemeId::Academic,
    ];

    /// Exact match on the stored identifier; anything else is not a theme.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "minimal" => Some(ThemeId::Minimal),
            "modern" => Some(ThemeId::Modern),
            "aesthetic" => Some(ThemeId::Aesthetic),
            "professional" => Some(ThemeId::Professional),
            "academic" => Some(ThemeId::Academic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeId::Minimal => "minimal",
            ThemeId::Modern => "modern",
            ThemeId::Aesthetic => "aesthetic",
            ThemeId::Professional => "professional",
            ThemeId::Academic => "academic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThemeId::Minimal => "Minimal",
            ThemeId::Modern => "Modern",
            ThemeId::Aesthetic => "Aesthetic",
            ThemeId::Professional => "Professional",
            ThemeId::Academic => "Academic",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ThemeId::Minimal => "Clean & simple",
            ThemeId::Modern => "Vibrant & glass",
            ThemeId::Aesthetic => "Soft & dreamy",
            ThemeId::Professional => "Corporate & serious",
            ThemeId::Academic => "Scholarly & research",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ThemeId::Minimal => "○",
            ThemeId::Modern => "◆",
            ThemeId::Aesthetic => "✦",
            ThemeId::Professional => "■",
            ThemeId::Academic => "◈",
        }
    }
}

impl std::fmt::Display for ThemeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
