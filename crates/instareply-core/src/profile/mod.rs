pub mod context;
pub mod store;

pub use context::ProfileContext;
pub use store::{ProfileStore, StoredProfiles};

use serde::{Deserialize, Serialize};

/// Id of the built-in profile present on first run.
pub const DEFAULT_PROFILE_ID: &str = "default";

/// Response tone of a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    #[default]
    Friendly,
    Casual,
    Formal,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Professional, Tone::Friendly, Tone::Casual, Tone::Formal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Casual => "casual",
            Tone::Formal => "formal",
        }
    }

    /// Parse a tone name, yielding `None` for anything unrecognized.
    pub fn parse_lenient(s: &str) -> Option<Tone> {
        s.parse().ok()
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tone: {s}"))
    }
}

/// A named bundle of reply-style preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub include_emojis: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Advisory only; nothing reads it yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Profile {
    /// The built-in profile used on first run and as the deletion fallback.
    pub fn default_profile() -> Self {
        Self {
            id: DEFAULT_PROFILE_ID.to_string(),
            name: "Default Profile".to_string(),
            include_emojis: true,
            tone: Some(Tone::Friendly),
            language: Some("en".to_string()),
        }
    }

    /// Tone with the friendly fallback applied.
    pub fn effective_tone(&self) -> Tone {
        self.tone.unwrap_or_default()
    }
}

/// Fields for a profile that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    #[serde(default = "default_include_emojis")]
    pub include_emojis: bool,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_include_emojis() -> bool {
    true
}

impl NewProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_emojis: true,
            tone: None,
            language: None,
        }
    }

    pub(crate) fn into_profile(self, id: String) -> Profile {
        Profile {
            id,
            name: self.name,
            include_emojis: self.include_emojis,
            tone: self.tone,
            language: self.language,
        }
    }
}

/// Field-mask update for a profile. Unset fields are left untouched and the
/// id is not part of the mask.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub include_emojis: Option<bool>,
    pub tone: Option<Tone>,
    pub language: Option<String>,
}

impl ProfileUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn include_emojis(mut self, include: bool) -> Self {
        self.include_emojis = Some(include);
        self
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.include_emojis.is_none()
            && self.tone.is_none()
            && self.language.is_none()
    }

    /// Merge the set fields into `profile`.
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(include) = self.include_emojis {
            profile.include_emojis = include;
        }
        if let Some(tone) = self.tone {
            profile.tone = Some(tone);
        }
        if let Some(language) = &self.language {
            profile.language = Some(language.clone());
        }
    }
}
