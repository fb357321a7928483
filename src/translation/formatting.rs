/*!
 * Post-processing applied to translated text before it is stored.
 *
 * Formatting is cosmetic and separate from the translation contract: the
 * service decides what a name means, the formatter only decides how it is
 * capitalised.
 */

use serde::{Deserialize, Serialize};

/// A normalization step applied to every translation
pub trait TextFormatter: Send + Sync + std::fmt::Debug {
    fn format(&self, text: &str) -> String;
}

/// Upper-case the first letter of every word, leave the rest untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleCase;

/// Store translations exactly as returned
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl TitleCase {
    /// Word boundary test: ASCII punctuation and whitespace separate words,
    /// letters, digits and underscores do not.
    fn is_separator(c: char) -> bool {
        if c.is_ascii() {
            return !(c.is_ascii_alphanumeric() || c == '_');
        }
        if c.is_alphanumeric() {
            return false;
        }
        c.is_whitespace()
    }
}

impl TextFormatter for TitleCase {
    fn format(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut previous = ' ';

        for c in text.chars() {
            if Self::is_separator(previous) {
                result.extend(c.to_uppercase());
            } else {
                result.push(c);
            }
            previous = c;
        }

        result
    }
}

impl TextFormatter for Verbatim {
    fn format(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Formatter selection in configuration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormatterKind {
    #[default]
    TitleCase,
    Verbatim,
}

impl FormatterKind {
    pub fn build(self) -> Box<dyn TextFormatter> {
        match self {
            Self::TitleCase => Box::new(TitleCase),
            Self::Verbatim => Box::new(Verbatim),
        }
    }
}

impl std::str::FromStr for FormatterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title_case" | "title" => Ok(Self::TitleCase),
            "verbatim" | "none" => Ok(Self::Verbatim),
            _ => Err(format!("unknown formatter '{}'", s)),
        }
    }
}
