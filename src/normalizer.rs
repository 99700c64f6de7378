//! Release-title cleanup.
//!
//! A raw title such as
//! `Solo Leveling S02 1080p CR WEB-DL DUAL AAC2.0 H 264-VARYG (Ore dake Level Up na Ken, Dual-Audio, Multi-Subs)`
//! becomes `Solo Leveling S02 Ore dake Level Up na Ken`: the main title, the
//! season marker, and the romanized alternate title, with the release noise
//! dropped.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::base_title;

/// Particles that identify a parenthesized romanized (alternate) title.
pub const ROMANIZATION_PARTICLES: &[&str] = &[
    "dake", "Level", "Ken", "no", "wo", "ga", "ni", "de", "to", "wa", "ka",
];

/// Extra particles accepted when deciding whether a parenthesized fragment
/// survives the token-by-token cleanup.
pub const FRAGMENT_EXTRA_PARTICLES: &[&str] = &["Ore"];

/// Trailing technical notes stripped from an alternate title, e.g. `, Dual-Audio, Multi-Subs`.
pub const TECHNICAL_SUFFIXES: &[&str] = &["Dual-Audio", "Multi-Subs", "DUAL"];

/// Release noise removed token by token when the title has no recognizable
/// `title [season] resolution|bracket` layout. Applied in order; each match
/// becomes a single space.
pub const NOISE_PATTERNS: &[&str] = &[
    // Resolution
    r"(?i)\b\d{3,4}p\b",
    // Source
    r"(?i)\b(?:WEB-DL|HDTV|BluRay|Blu-ray|BD-?Rip|DVD-?Rip)\b",
    // Video codec
    r"(?i)\bx26[45]\b",
    r"(?i)\bHEVC\b",
    r"(?i)\bH\.?26[45]\b",
    // Audio codec with optional channel spec (AAC2.0)
    r"(?i)\b(?:AAC|FLAC|MP3)[\d.]*\b",
    r"(?i)\bDUAL(?:-?Audio)?\b",
    // Subtitles
    r"(?i)\b(?:Multi-?Subs?|English-?Sub)\b",
    // Batch
    r"(?i)\b(?:Batch|Complete|Collection)\b",
    // Short all-caps group tags like CR-VARYG
    r"\b[A-Z]{2,4}-[A-Z]+\b",
    r"\[[^\]]*\]",
    // Inline episode markers
    r"(?i)\b(?:Episode|Ep|E)\s*\d+\b",
    // File sizes
    r"(?i)\b\d+\.\d+\s?(?:GB|MB)\b",
];

// Re-running cleanup on its own output can expose tokens the structured
// path kept (an `E01` before the resolution); repeat until stable.
const MAX_PASSES: usize = 4;

fn alternation(words: &[&str]) -> String {
    words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|")
}

pub struct TitleNormalizer {
    structured: Regex,
    season_marker: Regex,
    alternate_fragment: Regex,
    fragment_keyword: Regex,
    technical_suffix: Regex,
    parenthesized: Regex,
    noise: Vec<Regex>,
}

impl TitleNormalizer {
    pub fn new(
        noise_patterns: &[&str],
        particles: &[&str],
        extra_fragment_particles: &[&str],
        technical_suffixes: &[&str],
    ) -> Result<Self, regex::Error> {
        let fragment_words: Vec<&str> = particles
            .iter()
            .chain(extra_fragment_particles.iter())
            .copied()
            .collect();

        Ok(TitleNormalizer {
            structured: Regex::new(
                r"(?i)^([^\[(]+?)(?:\s+(?:S\d+|Season\s*\d+))?\s*(?:\d{3,4}p|[\[(])",
            )?,
            season_marker: Regex::new(r"(?i)\b(S\d+|Season\s*\d+)\b")?,
            alternate_fragment: Regex::new(&format!(
                r"(?i)\(([^)]*(?:{})[^)]*)\)",
                alternation(particles)
            ))?,
            fragment_keyword: Regex::new(&format!(
                r"(?i)\b(?:{})\b",
                alternation(&fragment_words)
            ))?,
            technical_suffix: Regex::new(&format!(
                r"(?i),\s*(?:{}).*$",
                alternation(technical_suffixes)
            ))?,
            parenthesized: Regex::new(r"\(([^)]*)\)")?,
            noise: noise_patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    pub fn normalize(&self, raw: &str) -> String {
        let mut current = self.normalize_once(raw);
        for _ in 1..MAX_PASSES {
            let next = self.normalize_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn normalize_once(&self, raw: &str) -> String {
        let cleaned = match self.structured.captures(raw) {
            Some(caps) => self.structured_cleanup(raw, caps.get(1).map_or("", |m| m.as_str())),
            None => self.token_cleanup(raw),
        };
        collapse_whitespace(&cleaned)
    }

    fn structured_cleanup(&self, raw: &str, main: &str) -> String {
        let mut cleaned = main.trim().to_string();

        if let Some(season) = self.season_marker.captures(raw).and_then(|c| c.get(1)) {
            cleaned.push(' ');
            cleaned.push_str(season.as_str());
        }

        if let Some(alt) = self.alternate_title(raw) {
            let main_lower = main.trim().to_lowercase();
            if !main_lower.contains(&alt.to_lowercase()) && alt.chars().count() > 3 {
                cleaned.push(' ');
                cleaned.push_str(&alt);
            }
        }

        cleaned
    }

    fn token_cleanup(&self, raw: &str) -> String {
        let mut cleaned = raw.to_string();
        for re in &self.noise {
            cleaned = re.replace_all(&cleaned, " ").into_owned();
        }

        self.parenthesized
            .replace_all(&cleaned, |caps: &Captures| {
                let content = caps.get(1).map_or("", |m| m.as_str()).trim();
                if self.fragment_keyword.is_match(content) {
                    format!(" {}", self.strip_technical_suffix(content).trim())
                } else {
                    String::new()
                }
            })
            .into_owned()
    }

    /// First parenthesized fragment that reads like a romanized title, with
    /// any trailing technical suffix removed.
    pub fn alternate_title(&self, raw: &str) -> Option<String> {
        let fragment = self.alternate_fragment.captures(raw)?.get(1)?.as_str().trim();
        Some(self.strip_technical_suffix(fragment).trim().to_string())
    }

    pub fn strip_technical_suffix(&self, fragment: &str) -> String {
        self.technical_suffix.replace(fragment, "").into_owned()
    }
}

lazy_static! {
    static ref STANDARD: TitleNormalizer = TitleNormalizer::new(
        NOISE_PATTERNS,
        ROMANIZATION_PARTICLES,
        FRAGMENT_EXTRA_PARTICLES,
        TECHNICAL_SUFFIXES,
    )
    .expect("built-in token tables are valid patterns");
    static ref SEASON_NUMBER: Regex = Regex::new(r"(?i)\b(?:S|Season\s*)(\d+)\b").unwrap();
}

pub fn normalize(raw: &str) -> String {
    STANDARD.normalize(raw)
}

pub fn alternate_title(raw: &str) -> Option<String> {
    STANDARD.alternate_title(raw)
}

/// Season number from an `S<n>` or `Season <n>` marker. `None` means the
/// season is unknown, not season 1.
pub fn extract_season(title: &str) -> Option<u32> {
    SEASON_NUMBER
        .captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Everything derived from one raw title, computed up front so the search
/// strategies and the match selector read the same values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTitle {
    pub raw: String,
    pub normalized: String,
    pub base: String,
    pub season: Option<u32>,
}

impl ParsedTitle {
    pub fn parse(raw: &str) -> Self {
        ParsedTitle {
            raw: raw.to_string(),
            normalized: normalize(raw),
            base: base_title::from_torrent(raw),
            season: extract_season(raw),
        }
    }
}
