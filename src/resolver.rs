// 🧭 Name Resolver - Boundary names → canonical entity keys
//
// Problem solved:
// - "United States of America" (boundaries) vs "United States" (temperatures)
// - "Dem. Rep. Congo" vs "Congo (Democratic Republic Of The)"
// - "Guinea-Bissau" vs "Guinea Bissau", "Trinidad and Tobago" vs "Trinidad And Tobago"
//
// Order: alias table (exact) → heuristics (folding, comma inversion,
// substring stripping) → raw name unchanged. Pure, total, idempotent.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

// ============================================================================
// ALIAS TABLE
// ============================================================================

/// Built-in aliases: boundary display name → temperature table name
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("United States of America", "United States"),
    ("Russian Federation", "Russia"),
    ("Dem. Rep. Congo", "Congo (Democratic Republic Of The)"),
    ("Democratic Republic of the Congo", "Congo (Democratic Republic Of The)"),
    ("Republic of the Congo", "Congo"),
    ("Côte d'Ivoire", "Côte D'Ivoire"),
    ("Ivory Coast", "Côte D'Ivoire"),
    ("Bosnia and Herz.", "Bosnia And Herzegovina"),
    ("Czechia", "Czech Republic"),
    ("Myanmar", "Burma"),
    ("North Macedonia", "Macedonia"),
    ("eSwatini", "Swaziland"),
    ("Eswatini", "Swaziland"),
    ("Central African Rep.", "Central African Republic"),
    ("Dominican Rep.", "Dominican Republic"),
    ("Eq. Guinea", "Equatorial Guinea"),
    ("W. Sahara", "Western Sahara"),
    ("Falkland Is.", "Falkland Islands (Islas Malvinas)"),
    ("Fr. S. Antarctic Lands", "French Southern And Antarctic Lands"),
    ("Solomon Is.", "Solomon Islands"),
    ("Republic of Serbia", "Serbia"),
    ("Palestine", "Palestina"),
    ("United Republic of Tanzania", "Tanzania"),
    ("Lao PDR", "Laos"),
    ("Viet Nam", "Vietnam"),
    ("Brunei Darussalam", "Brunei"),
    ("Syrian Arab Republic", "Syria"),
    ("Korea, Republic of", "South Korea"),
    ("Korea, Dem. People's Rep.", "North Korea"),
    ("The Bahamas", "Bahamas"),
    ("Macao", "Macau"),
    ("Timor-Leste", "Timor Leste"),
];

/// Ordered substring-stripping heuristics; longer patterns come first so that
/// "People's Republic of " is removed whole rather than leaving "People's ".
const STRIP_PATTERNS: &[&str] = &[
    "People's Republic of ",
    "Democratic Republic of ",
    "Federal Republic of ",
    "Islamic Republic of ",
    "Republic of ",
    "Kingdom of ",
    "State of ",
    "The ",
    "the ",
    " of America",
    " Federation",
];

/// One alias entry, as stored in an alias override JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasRule {
    /// Raw boundary name (exact match)
    pub raw: String,

    /// Canonical temperature-table name
    pub canonical: String,
}

impl AliasRule {
    pub fn new(raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        AliasRule {
            raw: raw.into(),
            canonical: canonical.into(),
        }
    }
}

/// Load alias overrides from a JSON file (`[{"raw": ..., "canonical": ...}]`)
pub fn load_aliases<P: AsRef<Path>>(path: P) -> Result<Vec<AliasRule>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read alias file: {:?}", path.as_ref()))?;

    let rules: Vec<AliasRule> =
        serde_json::from_str(&content).context("Failed to parse alias JSON")?;

    Ok(rules)
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// How a raw name was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "canonical")]
pub enum Resolution {
    /// Raw name is already a known canonical entity
    Exact(String),

    /// Found in the alias table
    Alias(String),

    /// Found by folding, comma inversion or substring stripping
    Heuristic(String),

    /// Nothing matched; the raw name is kept as-is
    Unmatched(String),
}

impl Resolution {
    pub fn canonical(&self) -> &str {
        match self {
            Resolution::Exact(name)
            | Resolution::Alias(name)
            | Resolution::Heuristic(name)
            | Resolution::Unmatched(name) => name,
        }
    }

    pub fn into_canonical(self) -> String {
        match self {
            Resolution::Exact(name)
            | Resolution::Alias(name)
            | Resolution::Heuristic(name)
            | Resolution::Unmatched(name) => name,
        }
    }

    pub fn is_matched(&self) -> bool {
        !matches!(self, Resolution::Unmatched(_))
    }
}

// ============================================================================
// NAME RESOLVER
// ============================================================================

#[derive(Debug, Clone)]
pub struct NameResolver {
    /// Raw name → canonical name
    aliases: HashMap<String, String>,

    /// Known canonical entities (baseline keys)
    known: HashSet<String>,

    /// Folded key → canonical name (case/punctuation-insensitive lookup)
    folded: HashMap<String, String>,
}

impl NameResolver {
    /// Create a resolver over a set of known canonical names, with the
    /// built-in alias table
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known: HashSet<String> = known.into_iter().map(Into::into).collect();

        // Sorted so that folding collisions resolve the same way on every run
        let mut folded = HashMap::new();
        let sorted: BTreeSet<&String> = known.iter().collect();
        for name in sorted {
            folded.entry(fold(name)).or_insert_with(|| name.clone());
        }

        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
            .collect();

        NameResolver {
            aliases,
            known,
            folded,
        }
    }

    /// Merge alias overrides over the built-in table
    pub fn with_aliases(mut self, rules: impl IntoIterator<Item = AliasRule>) -> Self {
        for rule in rules {
            self.aliases.insert(rule.raw, rule.canonical);
        }
        self
    }

    /// Resolve a raw boundary name to its canonical key
    ///
    /// Example: "United States of America" → "United States"
    pub fn resolve(&self, raw_name: &str) -> String {
        self.resolve_checked(raw_name).into_canonical()
    }

    /// Resolve and report which step matched
    pub fn resolve_checked(&self, raw_name: &str) -> Resolution {
        // Canonical input is never re-mapped
        if self.known.contains(raw_name) {
            return Resolution::Exact(raw_name.to_string());
        }

        if let Some(canonical) = self.aliases.get(raw_name) {
            // An alias pointing outside the known set would make a second
            // resolve drift, so it only counts without a known set at all
            if self.known.is_empty() || self.known.contains(canonical) {
                return Resolution::Alias(canonical.clone());
            }
        }

        if let Some(canonical) = self.heuristic_match(raw_name) {
            return Resolution::Heuristic(canonical);
        }

        Resolution::Unmatched(raw_name.to_string())
    }

    /// Check if a name is a known canonical entity
    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    fn heuristic_match(&self, raw_name: &str) -> Option<String> {
        let trimmed = raw_name.trim();

        let mut bases = vec![trimmed.to_string()];
        if let Some(inverted) = invert_comma(trimmed) {
            bases.push(inverted);
        }

        for base in bases {
            if let Some(found) = self.lookup(&base) {
                return Some(found);
            }

            // Strip cumulatively, checking after every change
            let mut candidate = base;
            for pattern in STRIP_PATTERNS {
                if !candidate.contains(pattern) {
                    continue;
                }
                candidate = candidate.replacen(pattern, "", 1).trim().to_string();
                if candidate.is_empty() {
                    break;
                }
                if let Some(found) = self.lookup(&candidate) {
                    return Some(found);
                }
            }
        }

        None
    }

    fn lookup(&self, candidate: &str) -> Option<String> {
        if self.known.contains(candidate) {
            return Some(candidate.to_string());
        }
        self.folded.get(&fold(candidate)).cloned()
    }
}

/// "Korea, Republic of" → "Republic of Korea"
fn invert_comma(name: &str) -> Option<String> {
    let (head, tail) = name.split_once(", ")?;
    if tail.is_empty() || tail.contains(',') {
        return None;
    }
    Some(format!("{} {}", tail.trim(), head.trim()))
}

/// Case, punctuation and hyphen-insensitive comparison key
///
/// "Guinea-Bissau" and "Guinea Bissau" fold to the same key; so do
/// "Antigua & Barbuda" and "Antigua And Barbuda".
fn fold(name: &str) -> String {
    name.replace('&', " and ")
        .chars()
        .map(|c| if c == '-' { ' ' } else { c })
        .filter(|c| !matches!(c, '.' | '\'' | '’'))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
