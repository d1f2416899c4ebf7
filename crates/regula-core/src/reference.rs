//! Regulation reference recognition and canonical ids.
//!
//! Every place that needs to know "which regulation is this text talking
//! about" goes through this module: query parsing, the regulation lock, the
//! reranker's name-match signal, and post-hoc citation validation.
//!
//! # Indonesian citation conventions
//!
//! - Full citation: `POJK Nomor 11 Tahun 2022`, `UU No. 21 Tahun 2011`,
//!   `UU 21/2011`, `SEOJK 5 2023`
//! - Designation without a year: `POJK 27`, `UU Nomor 4`
//! - Corpus filenames: `{TYPE}_{NUMBER}_{YEAR}.pdf`, e.g. `POJK_11_2022.pdf`
//!
//! Numbers are normalized by stripping leading zeros, so `POJK 011/2022`
//! and `POJK 11 Tahun 2022` share the canonical id `POJK_11_2022`.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::chunk::RegulationType;

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(POJK|SEOJK|UU)\s*(?:No\.|Nomor)?\s*(\d+)\s*(?:/|Tahun)?\s*(\d{4})\b")
        .expect("valid regex")
});

static DESIGNATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(POJK|SEOJK|UU)\s*(?:No\.|Nomor)?\s*(\d+)").expect("valid regex")
});

/// Filename-style id as cited in answers, e.g. `[UU_21_2011.pdf]`.
static FILENAME_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(POJK|SEOJK|UU)_(\d+)_(\d{4})").expect("valid regex")
});

static QUERY_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:tahun\s+)?(20\d{2})").expect("valid regex"));

static FOUR_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("valid regex"));

/// A fully qualified regulation citation: type, number and year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegulationReference {
    pub kind: RegulationType,
    /// Regulation number with leading zeros stripped.
    pub number: String,
    pub year: u16,
    /// `"{TYPE}_{NUMBER}_{YEAR}"`, the stem of the matching corpus filename.
    pub canonical_id: String,
}

impl RegulationReference {
    pub fn new(kind: RegulationType, number: &str, year: u16) -> Self {
        let number = strip_leading_zeros(number);
        let canonical_id = format!("{}_{}_{}", kind.as_str(), number, year);
        Self {
            kind,
            number,
            year,
            canonical_id,
        }
    }

    /// Whether a corpus filename belongs to this regulation
    /// (case-insensitive substring match on the canonical id).
    pub fn matches_source(&self, source: &str) -> bool {
        source.to_ascii_uppercase().contains(&self.canonical_id)
    }
}

impl fmt::Display for RegulationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.number, self.year)
    }
}

/// A regulation named by type and number only (`POJK 27`, `UU Nomor 4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegulationDesignation {
    pub kind: RegulationType,
    pub number: String,
}

impl RegulationDesignation {
    /// Whether a corpus filename names this regulation.
    ///
    /// The filename's extension and any trailing `_YYYY` are ignored; the
    /// remaining stem must start with `{TYPE}_{NUMBER}` as whole `_`-separated
    /// segments, so `POJK 1` does not match `POJK_11_2022.pdf`.
    pub fn matches_source(&self, source: &str) -> bool {
        let stem = source
            .rsplit_once('.')
            .map_or(source, |(stem, _)| stem)
            .to_ascii_uppercase();
        let mut segments = stem.split('_');
        let kind_matches = segments
            .next()
            .is_some_and(|s| s.parse::<RegulationType>().ok() == Some(self.kind));
        let number_matches = segments
            .next()
            .is_some_and(|s| strip_leading_zeros(s) == self.number);
        kind_matches && number_matches
    }
}

impl fmt::Display for RegulationDesignation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.number)
    }
}

/// Find the first full regulation citation in `text`.
///
/// Returns `None` when the text names no regulation; absence is an ordinary
/// outcome, not an error.
pub fn parse(text: &str) -> Option<RegulationReference> {
    REFERENCE_RE.captures(text).and_then(|caps| from_captures(&caps))
}

/// Find every full regulation citation in `text`, in order of appearance.
///
/// Both written citations (`UU 21/2011`) and filename ids (`UU_21_2011.pdf`)
/// are recognized; the two forms never overlap.
pub fn find_all(text: &str) -> Vec<RegulationReference> {
    let mut found: Vec<(usize, RegulationReference)> = REFERENCE_RE
        .captures_iter(text)
        .chain(FILENAME_ID_RE.captures_iter(text))
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            from_captures(&caps).map(|r| (start, r))
        })
        .collect();
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, r)| r).collect()
}

/// Find the first type+number designation in `text`, with or without a year.
pub fn parse_designation(text: &str) -> Option<RegulationDesignation> {
    let caps = DESIGNATION_RE.captures(text)?;
    let kind = caps.get(1)?.as_str().parse().ok()?;
    Some(RegulationDesignation {
        kind,
        number: strip_leading_zeros(caps.get(2)?.as_str()),
    })
}

/// First `20xx` year mentioned in a query, optionally preceded by "tahun".
pub fn query_year(query: &str) -> Option<u16> {
    QUERY_YEAR_RE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// First run of four digits anywhere in a source filename.
///
/// This follows the corpus naming convention `{TYPE}_{NUMBER}_{YEAR}.pdf`
/// only as long as the regulation number itself has fewer than four digits.
pub fn source_year(source: &str) -> Option<u16> {
    FOUR_DIGITS_RE
        .find(source)
        .and_then(|m| m.as_str().parse().ok())
}

fn from_captures(caps: &Captures<'_>) -> Option<RegulationReference> {
    let kind = caps.get(1)?.as_str().parse().ok()?;
    let number = caps.get(2)?.as_str();
    let year = caps.get(3)?.as_str().parse().ok()?;
    Some(RegulationReference::new(kind, number, year))
}

fn strip_leading_zeros(number: &str) -> String {
    let trimmed = number.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nomor_tahun_form() {
        let r = parse("Apa isi POJK Nomor 11 Tahun 2022?").unwrap();
        assert_eq!(r.kind, RegulationType::Pojk);
        assert_eq!(r.number, "11");
        assert_eq!(r.year, 2022);
        assert_eq!(r.canonical_id, "POJK_11_2022");
    }

    #[test]
    fn parses_slash_form_case_insensitive() {
        let r = parse("menurut uu 21/2011").unwrap();
        assert_eq!(r.canonical_id, "UU_21_2011");
        assert_eq!(r.to_string(), "UU 21/2011");
    }

    #[test]
    fn parses_no_dot_and_bare_space_forms() {
        assert_eq!(
            parse("SEOJK No. 5 Tahun 2023").unwrap().canonical_id,
            "SEOJK_5_2023"
        );
        assert_eq!(parse("POJK 27 2022").unwrap().canonical_id, "POJK_27_2022");
    }

    #[test]
    fn strips_leading_zeros() {
        assert_eq!(parse("POJK 011/2022").unwrap().canonical_id, "POJK_11_2022");
        assert_eq!(parse("UU 000/2020").unwrap().number, "0");
    }

    #[test]
    fn absence_is_none() {
        assert!(parse("Apa itu modal minimum bank?").is_none());
        assert!(parse("POJK tentang modal").is_none());
        assert!(parse("POJK 27").is_none());
    }

    #[test]
    fn find_all_returns_every_mention() {
        let refs = find_all("Lihat UU 21/2011 dan POJK Nomor 27 Tahun 2022 serta UU 4 2023.");
        let ids: Vec<&str> = refs.iter().map(|r| r.canonical_id.as_str()).collect();
        assert_eq!(ids, vec!["UU_21_2011", "POJK_27_2022", "UU_4_2023"]);
    }

    #[test]
    fn find_all_includes_filename_ids() {
        let refs = find_all("Lihat [POJK_027_2022.pdf], Halaman 3 dan UU 21/2011 serta [uu_4_2023.pdf]");
        let ids: Vec<&str> = refs.iter().map(|r| r.canonical_id.as_str()).collect();
        assert_eq!(ids, vec!["POJK_27_2022", "UU_21_2011", "UU_4_2023"]);
    }

    #[test]
    fn reference_matches_source_case_insensitive() {
        let r = parse("POJK 11 Tahun 2022").unwrap();
        assert!(r.matches_source("POJK_11_2022.pdf"));
        assert!(r.matches_source("pojk_11_2022.pdf"));
        assert!(!r.matches_source("POJK_27_2022.pdf"));
    }

    #[test]
    fn designation_without_year() {
        let d = parse_designation("jelaskan POJK Nomor 027").unwrap();
        assert_eq!(d.kind, RegulationType::Pojk);
        assert_eq!(d.number, "27");
        assert_eq!(d.to_string(), "POJK 27");
    }

    #[test]
    fn designation_matches_whole_segments() {
        let d = parse_designation("POJK 1").unwrap();
        assert!(d.matches_source("POJK_1_2020.pdf"));
        assert!(!d.matches_source("POJK_11_2022.pdf"));
        assert!(!d.matches_source("SEOJK_1_2020.pdf"));
        assert!(!d.matches_source("unknown"));
    }

    #[test]
    fn years() {
        assert_eq!(query_year("POJK 11 Tahun 2022"), Some(2022));
        assert_eq!(query_year("aturan 2019 tentang"), Some(2019));
        assert_eq!(query_year("sejak 1998"), None);
        assert_eq!(source_year("POJK_11_2022.pdf"), Some(2022));
        assert_eq!(source_year("notes.pdf"), None);
    }
}
