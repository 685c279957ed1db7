//! # Localization
//!
//! Flat key -> label tables for the storefront, one per language.

use serde::{Deserialize, Serialize};

/// Languages the shop ships labels for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    /// ISO 639-1 code
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }

    /// Parse a language code, accepting region suffixes like `de-DE`
    pub fn parse(code: &str) -> Option<Self> {
        let primary = code
            .split(|c| c == '-' || c == '_' || c == ',' || c == ';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Language::En),
            "de" => Some(Language::De),
            _ => None,
        }
    }

    /// Parse or fall back to English
    pub fn parse_or_default(code: &str) -> Self {
        Self::parse(code).unwrap_or_default()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const EN: &[(&str, &str)] = &[
    ("Price", "Price"),
    ("Buy", "Buy"),
    ("Website", "Website"),
    ("Demo", "Demo"),
    ("Download", "Download"),
    ("Net", "Net"),
    ("Gross", "Gross"),
];

const DE: &[(&str, &str)] = &[
    ("Price", "Preis"),
    ("Buy", "Kaufen"),
    ("Website", "Webseite"),
    ("Demo", "Demo"),
    ("Download", "Download"),
    ("Net", "Netto"),
    ("Gross", "Brutto"),
];

/// Look up a label; unknown keys come back verbatim.
pub fn label<'a>(language: Language, key: &'a str) -> &'a str {
    let table = match language {
        Language::En => EN,
        Language::De => DE,
    };
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(key)
}
