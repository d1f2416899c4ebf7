//! Corpus chunk records and regulation types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three regulation families present in the corpus.
///
/// Ordering follows legal hierarchy: statutes first, then OJK regulations,
/// then OJK circular letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegulationType {
    /// Undang-Undang (statute).
    Uu,
    /// Peraturan OJK.
    Pojk,
    /// Surat Edaran OJK.
    Seojk,
}

impl RegulationType {
    pub const ALL: [RegulationType; 3] = [Self::Uu, Self::Pojk, Self::Seojk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uu => "UU",
            Self::Pojk => "POJK",
            Self::Seojk => "SEOJK",
        }
    }

    /// Regulation type of a source filename, taken from the prefix before the
    /// first underscore (`POJK_11_2022.pdf` → `Pojk`).
    ///
    /// Filenames without an underscore or with an unknown prefix yield `None`.
    pub fn from_source(source: &str) -> Option<Self> {
        let (prefix, _) = source.split_once('_')?;
        prefix.parse().ok()
    }
}

impl fmt::Display for RegulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegulationType {
    type Err = UnknownRegulationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UU" => Ok(Self::Uu),
            "POJK" => Ok(Self::Pojk),
            "SEOJK" => Ok(Self::Seojk),
            _ => Err(UnknownRegulationType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown regulation type: {0}")]
pub struct UnknownRegulationType(pub String);

/// One page-level passage of a regulation document.
///
/// Chunks are created once by the corpus loader and shared read-only
/// (behind `Arc`) by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{source}::{page}"`, unique per corpus; rank fusion dedups on it.
    pub id: String,
    /// Source filename, e.g. `POJK_11_2022.pdf`.
    pub source: String,
    /// 0-based page index.
    pub page: u32,
    pub content: String,
    /// Cover or identity page (page 0 or 1) carrying the official title.
    pub is_identity_page: bool,
}

impl Chunk {
    pub fn new(source: impl Into<String>, page: u32, content: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: format!("{source}::{page}"),
            source,
            page,
            content: content.into(),
            is_identity_page: page <= 1,
        }
    }

    /// Deduplication key used by rank fusion.
    pub fn key(&self) -> (&str, u32) {
        (self.source.as_str(), self.page)
    }

    pub fn regulation_type(&self) -> Option<RegulationType> {
        RegulationType::from_source(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_key_are_source_and_page() {
        let chunk = Chunk::new("POJK_11_2022.pdf", 3, "isi");
        assert_eq!(chunk.id, "POJK_11_2022.pdf::3");
        assert_eq!(chunk.key(), ("POJK_11_2022.pdf", 3));
        assert!(!chunk.is_identity_page);
    }

    #[test]
    fn cover_pages_are_identity_pages() {
        assert!(Chunk::new("UU_21_2011.pdf", 0, "x").is_identity_page);
        assert!(Chunk::new("UU_21_2011.pdf", 1, "x").is_identity_page);
        assert!(!Chunk::new("UU_21_2011.pdf", 2, "x").is_identity_page);
    }

    #[test]
    fn type_from_source_prefix() {
        assert_eq!(
            RegulationType::from_source("POJK_27_2022.pdf"),
            Some(RegulationType::Pojk)
        );
        assert_eq!(
            RegulationType::from_source("seojk_5_2023.pdf"),
            Some(RegulationType::Seojk)
        );
        assert_eq!(RegulationType::from_source("UU.pdf"), None);
        assert_eq!(RegulationType::from_source("PBI_1_2020.pdf"), None);
    }

    #[test]
    fn type_serializes_uppercase() {
        let json = serde_json::to_string(&RegulationType::Seojk).unwrap();
        assert_eq!(json, "\"SEOJK\"");
    }
}
