use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::entities::law::canonical_law_code;
use crate::schema::EntityType;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,!?;:']").expect("valid punctuation pattern"));

static PARAGRAPH_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:§{1,2}|paragraph(?:en)?|par\.)\s*(\d+)\s*([a-z])?$")
        .expect("valid paragraph key pattern")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\.\s*(\d{1,2})\.\s*(\d{4})$").expect("valid numeric date pattern")
});

static SPELLED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})\.?\s*([a-zäöü]+)\.?\s+(\d{4})$").expect("valid spelled date pattern")
});

static DEFAULT_NORMALIZER: LazyLock<EntityNormalizer> = LazyLock::new(EntityNormalizer::new);

const MONTHS: &[(&str, u32)] = &[
    ("januar", 1),
    ("jänner", 1),
    ("februar", 2),
    ("märz", 3),
    ("maerz", 3),
    ("april", 4),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("november", 11),
    ("dezember", 12),
];

// Common spellings that should land on the same node
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("arbeitsagentur", "agentur für arbeit"),
    ("bundesagentur für arbeit", "agentur für arbeit"),
    ("drv", "deutsche rentenversicherung"),
    ("persoenliches budget", "persönliches budget"),
    ("eingliederungshilfeträger", "träger der eingliederungshilfe"),
];

pub struct EntityNormalizer {
    /// Maps normalized name -> canonical name
    aliases: HashMap<String, String>,
}

impl Default for EntityNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityNormalizer {
    pub fn new() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
            .collect();

        Self { aliases }
    }

    /// Register an additional spelling for a canonical name.
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .insert(Self::clean(alias), Self::clean(canonical));
        self
    }

    /// Type-aware normalization key.
    ///
    /// Two mentions of the same real-world entity map to the same key, e.g.
    /// "SGB IX", "SGB-IX" and "Sozialgesetzbuch IX" all become "sgb-ix".
    pub fn normalize(&self, name: &str, entity_type: &EntityType) -> String {
        let typed = match entity_type {
            EntityType::Law => canonical_law_code(name).map(|code| code.to_lowercase()),
            EntityType::Paragraph => paragraph_key(name),
            EntityType::Date => parse_german_date(name).map(|d| d.format("%Y-%m-%d").to_string()),
            EntityType::Amount => parse_amount(name).map(|v| format!("{:.2}", v)),
            _ => None,
        };

        if let Some(key) = typed {
            return key;
        }

        let normalized = Self::clean(name);
        match self.aliases.get(&normalized) {
            Some(canonical) => canonical.clone(),
            None => normalized,
        }
    }

    /// Lowercase, strip punctuation, collapse whitespace
    fn clean(name: &str) -> String {
        let lowered = name.to_lowercase();
        let stripped = PUNCTUATION.replace_all(lowered.trim(), "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Simple similarity check used to flag likely duplicates
    pub fn are_similar(&self, a: &str, b: &str) -> bool {
        let a = Self::clean(a);
        let b = Self::clean(b);

        if a == b {
            return true;
        }

        // One is contained in the other; very short names are too ambiguous
        if a.len() >= 4 && b.len() >= 4 && (a.contains(&b) || b.contains(&a)) {
            return true;
        }

        // Check if they share most words (for multi-word entities)
        let words_a: Vec<&str> = a.split_whitespace().collect();
        let words_b: Vec<&str> = b.split_whitespace().collect();

        if words_a.len() > 1 && words_b.len() > 1 {
            let common: usize = words_a.iter().filter(|w| words_b.contains(w)).count();

            let total = words_a.len().max(words_b.len());
            return common as f64 / total as f64 > 0.7;
        }

        false
    }

    /// Get the mapping of all aliases
    pub fn get_aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }
}

/// Normalize with the default alias table.
pub fn normalize_name(name: &str, entity_type: &EntityType) -> String {
    DEFAULT_NORMALIZER.normalize(name, entity_type)
}

/// "§ 29", "Paragraph 29", "Par. 29" -> "§29"; keeps a letter suffix ("§29a").
pub fn paragraph_key(name: &str) -> Option<String> {
    let compact = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let caps = PARAGRAPH_KEY.captures(&compact)?;
    let number = caps.get(1)?.as_str();
    let suffix = caps
        .get(2)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();
    Some(format!("§{}{}", number, suffix))
}

/// Parse "15.03.2024" or "15. März 2024" (day first).
pub fn parse_german_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    if let Some(caps) = NUMERIC_DATE.captures(text) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let caps = SPELLED_DATE.captures(text)?;
    let day = caps[1].parse().ok()?;
    let month_name = caps[2].to_lowercase();
    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == month_name)
        .map(|(_, m)| *m)?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a German-formatted amount ("1.500,50 €", "EUR 200", "42,5 Euro").
pub fn parse_amount(text: &str) -> Option<f64> {
    let mut number = text.trim().to_string();
    for token in ["€", "EUR", "Euro", "eur", "euro"] {
        number = number.replace(token, "");
    }
    let number = number.trim();

    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let cleaned = if number.contains(',') {
        number.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(number) {
        number.replace('.', "")
    } else {
        number.to_string()
    };

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_thousands_grouped(number: &str) -> bool {
    let groups: Vec<&str> = number.split('.').collect();
    groups.len() > 1
        && !groups[0].is_empty()
        && groups[0].len() <= 3
        && groups[1..].iter().all(|g| g.len() == 3)
}
