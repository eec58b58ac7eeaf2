//! Supported interface languages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    pub fn all() -> &'static [Locale] {
        &[Locale::En, Locale::Fr]
    }

    /// Path segment used in routes (`/en/...`, `/fr/...`)
    pub fn slug(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "en" => Some(Locale::En),
            "fr" => Some(Locale::Fr),
            _ => None,
        }
    }
}
