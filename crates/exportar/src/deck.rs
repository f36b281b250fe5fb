//! Deck metadata.
//!
//! The slide parser is an external collaborator; its output reaches the
//! pipeline as a small JSON manifest describing each slide's title,
//! speaker note, click count, and frontmatter. Slides are immutable
//! inputs here.

use crate::result::{ExportError, ExportResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Keywords may arrive as a list or as a comma separated scalar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    /// Already split
    List(Vec<String>),
    /// Comma separated scalar, split on use
    Scalar(String),
}

impl Keywords {
    /// Normalize to a list of trimmed, non-empty keywords
    #[must_use]
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            Self::Scalar(s) => s
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

/// Recognized slide frontmatter keys; unknown keys are preserved
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Frontmatter {
    /// Document author
    pub author: Option<String>,
    /// Document subject / description
    pub info: Option<String>,
    /// Document keywords
    pub keywords: Option<Keywords>,
    /// Exclude this slide's title from the table of contents
    pub hide_in_toc: bool,
    /// Unrecognized keys, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One slide of the deck
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// 1-based ordinal over the entire deck
    pub no: u32,
    /// Slide title, if any
    #[serde(default)]
    pub title: Option<String>,
    /// Heading level of the title (1 = top level)
    #[serde(default = "default_title_level")]
    pub title_level: u32,
    /// Speaker notes
    #[serde(default)]
    pub note: Option<String>,
    /// Number of click reveals on this slide (`clicks + 1` steps)
    #[serde(default)]
    pub clicks: u32,
    /// Frontmatter mapping
    #[serde(default)]
    pub frontmatter: Frontmatter,
}

const fn default_title_level() -> u32 {
    1
}

/// Immutable deck metadata for one export run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideDeck {
    /// Slides in deck order
    pub slides: Vec<Slide>,
}

impl SlideDeck {
    /// Load a deck manifest from a JSON file
    pub fn load(path: &Path) -> ExportResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let deck: Self = serde_json::from_str(&raw)?;
        deck.check()?;
        Ok(deck)
    }

    /// Number of slides
    #[must_use]
    pub fn len(&self) -> u32 {
        self.slides.len() as u32
    }

    /// Whether the deck is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Slide by 1-based index
    #[must_use]
    pub fn get(&self, no: u32) -> Option<&Slide> {
        self.slides.iter().find(|s| s.no == no)
    }

    /// Click count for a slide (0 when unknown)
    #[must_use]
    pub fn clicks(&self, no: u32) -> u32 {
        self.get(no).map_or(0, |s| s.clicks)
    }

    /// Frontmatter of the first slide, which carries deck-level metadata
    #[must_use]
    pub fn headmatter(&self) -> Option<&Frontmatter> {
        self.slides.first().map(|s| &s.frontmatter)
    }

    fn check(&self) -> ExportResult<()> {
        for (i, slide) in self.slides.iter().enumerate() {
            let expected = i as u32 + 1;
            if slide.no != expected {
                return Err(ExportError::invalid(format!(
                    "deck manifest is out of order: slide at position {expected} has no {}",
                    slide.no
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(no: u32, title: Option<&str>) -> Slide {
        Slide {
            no,
            title: title.map(String::from),
            title_level: 1,
            note: None,
            clicks: 0,
            frontmatter: Frontmatter::default(),
        }
    }

    #[test]
    fn test_keywords_scalar_split() {
        let k = Keywords::Scalar("rust, slides,,export ".to_string());
        assert_eq!(k.to_list(), vec!["rust", "slides", "export"]);
    }

    #[test]
    fn test_keywords_list_passthrough() {
        let k = Keywords::List(vec!["a".into(), "b".into()]);
        assert_eq!(k.to_list(), vec!["a", "b"]);
    }

    #[test]
    fn test_deck_lookup() {
        let deck = SlideDeck {
            slides: vec![slide(1, Some("Intro")), slide(2, None)],
        };
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.get(1).unwrap().title.as_deref(), Some("Intro"));
        assert!(deck.get(3).is_none());
        assert_eq!(deck.clicks(2), 0);
    }

    #[test]
    fn test_manifest_parsing_with_defaults() {
        let json = r#"{
            "slides": [
                { "no": 1, "title": "A", "clicks": 2,
                  "frontmatter": { "author": "X", "keywords": "a,b", "theme": "seriph" } },
                { "no": 2 }
            ]
        }"#;
        let deck: SlideDeck = serde_json::from_str(json).unwrap();
        assert_eq!(deck.len(), 2);
        let first = deck.get(1).unwrap();
        assert_eq!(first.clicks, 2);
        assert_eq!(first.frontmatter.author.as_deref(), Some("X"));
        assert_eq!(
            first.frontmatter.keywords.as_ref().unwrap().to_list(),
            vec!["a", "b"]
        );
        // Unrecognized keys survive
        assert!(first.frontmatter.extra.contains_key("theme"));
        let second = deck.get(2).unwrap();
        assert_eq!(second.title_level, 1);
        assert_eq!(second.clicks, 0);
    }

    #[test]
    fn test_out_of_order_manifest_rejected() {
        let deck = SlideDeck {
            slides: vec![slide(1, None), slide(3, None)],
        };
        assert!(deck.check().is_err());
    }
}
