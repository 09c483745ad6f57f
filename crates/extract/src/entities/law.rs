use regex::Regex;
use std::sync::LazyLock;

use super::{EntityExtractor, compile_patterns, non_overlapping};
use crate::schema::{Entity, EntityAttributes, EntityType};

const ROMAN: &[&str] = &[
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII", "XIII", "XIV",
];

const ORDINALS: &[(&str, usize)] = &[
    ("erstes", 1),
    ("zweites", 2),
    ("drittes", 3),
    ("viertes", 4),
    ("fünftes", 5),
    ("sechstes", 6),
    ("siebtes", 7),
    ("achtes", 8),
    ("neuntes", 9),
    ("zehntes", 10),
    ("elftes", 11),
    ("zwölftes", 12),
    ("dreizehntes", 13),
    ("vierzehntes", 14),
];

// (lowercase surface, canonical code)
const OTHER_CODES: &[(&str, &str)] = &[
    ("bgb", "BGB"),
    ("bürgerlichesgesetzbuch", "BGB"),
    ("gg", "GG"),
    ("grundgesetz", "GG"),
    ("sgg", "SGG"),
    ("sozialgerichtsgesetz", "SGG"),
    ("vwvfg", "VwVfG"),
    ("verwaltungsverfahrensgesetz", "VwVfG"),
    ("verwaltungsverfahrensgesetzes", "VwVfG"),
    ("vwgo", "VwGO"),
    ("verwaltungsgerichtsordnung", "VwGO"),
    ("bthg", "BTHG"),
    ("bundesteilhabegesetz", "BTHG"),
    ("bundesteilhabegesetzes", "BTHG"),
    ("asylblg", "AsylbLG"),
    ("wogg", "WoGG"),
    ("beeg", "BEEG"),
    ("bkgg", "BKGG"),
];

// (code, full name, reference URL)
const LAW_INFO: &[(&str, &str, Option<&str>)] = &[
    ("SGB-I", "Sozialgesetzbuch Erstes Buch - Allgemeiner Teil", Some("https://www.gesetze-im-internet.de/sgb_1/")),
    ("SGB-II", "Sozialgesetzbuch Zweites Buch - Bürgergeld, Grundsicherung für Arbeitsuchende", Some("https://www.gesetze-im-internet.de/sgb_2/")),
    ("SGB-III", "Sozialgesetzbuch Drittes Buch - Arbeitsförderung", Some("https://www.gesetze-im-internet.de/sgb_3/")),
    ("SGB-IV", "Sozialgesetzbuch Viertes Buch - Gemeinsame Vorschriften für die Sozialversicherung", Some("https://www.gesetze-im-internet.de/sgb_4/")),
    ("SGB-V", "Sozialgesetzbuch Fünftes Buch - Gesetzliche Krankenversicherung", Some("https://www.gesetze-im-internet.de/sgb_5/")),
    ("SGB-VI", "Sozialgesetzbuch Sechstes Buch - Gesetzliche Rentenversicherung", Some("https://www.gesetze-im-internet.de/sgb_6/")),
    ("SGB-VII", "Sozialgesetzbuch Siebtes Buch - Gesetzliche Unfallversicherung", Some("https://www.gesetze-im-internet.de/sgb_7/")),
    ("SGB-VIII", "Sozialgesetzbuch Achtes Buch - Kinder- und Jugendhilfe", Some("https://www.gesetze-im-internet.de/sgb_8/")),
    ("SGB-IX", "Sozialgesetzbuch Neuntes Buch - Rehabilitation und Teilhabe von Menschen mit Behinderungen", Some("https://www.gesetze-im-internet.de/sgb_9_2018/")),
    ("SGB-X", "Sozialgesetzbuch Zehntes Buch - Sozialverwaltungsverfahren und Sozialdatenschutz", Some("https://www.gesetze-im-internet.de/sgb_10/")),
    ("SGB-XI", "Sozialgesetzbuch Elftes Buch - Soziale Pflegeversicherung", Some("https://www.gesetze-im-internet.de/sgb_11/")),
    ("SGB-XII", "Sozialgesetzbuch Zwölftes Buch - Sozialhilfe", Some("https://www.gesetze-im-internet.de/sgb_12/")),
    ("SGB-XIV", "Sozialgesetzbuch Vierzehntes Buch - Soziale Entschädigung", Some("https://www.gesetze-im-internet.de/sgb_14/")),
    ("BGB", "Bürgerliches Gesetzbuch", Some("https://www.gesetze-im-internet.de/bgb/")),
    ("GG", "Grundgesetz für die Bundesrepublik Deutschland", Some("https://www.gesetze-im-internet.de/gg/")),
    ("SGG", "Sozialgerichtsgesetz", Some("https://www.gesetze-im-internet.de/sgg/")),
    ("VwVfG", "Verwaltungsverfahrensgesetz", Some("https://www.gesetze-im-internet.de/vwvfg/")),
    ("VwGO", "Verwaltungsgerichtsordnung", Some("https://www.gesetze-im-internet.de/vwgo/")),
    ("BTHG", "Bundesteilhabegesetz", None),
    ("AsylbLG", "Asylbewerberleistungsgesetz", Some("https://www.gesetze-im-internet.de/asylblg/")),
];

static LAW_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"\bSGB\s*-?\s*(?:XIV|XIII|XII|XI|X|IX|VIII|VII|VI|V|IV|III|II|I|1[0-4]|[1-9])\b",
        r"\bSozialgesetzbuch\s*(?:\(SGB\)\s*)?-?\s*(?:XIV|XIII|XII|XI|X|IX|VIII|VII|VI|V|IV|III|II|I|1[0-4]|[1-9])\b",
        r"(?i)\b(?:erstes|zweites|drittes|viertes|fünftes|sechstes|siebtes|achtes|neuntes|zehntes|elftes|zwölftes|dreizehntes|vierzehntes)\s+Buch\s+(?:des\s+)?Sozialgesetzbuch(?:es|s)?\b",
        r"\b(?:BGB|GG|SGG|VwVfG|VwGO|BTHG|AsylbLG|WoGG|BEEG|BKGG)\b",
        r"\b(?:Bürgerliches\s+Gesetzbuch|Grundgesetz|Sozialgerichtsgesetz|Verwaltungsverfahrensgesetz(?:es)?|Verwaltungsgerichtsordnung|Bundesteilhabegesetz(?:es)?)\b",
    ])
});

/// Law citation found in text: byte span plus canonical code.
#[derive(Debug, Clone, PartialEq)]
pub struct LawMention {
    pub start: usize,
    pub end: usize,
    pub code: String,
}

/// Collapse any surface form to a canonical code such as "SGB-IX" or "VwVfG".
pub fn canonical_law_code(surface: &str) -> Option<String> {
    let compact: String = surface
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')' && *c != '.')
        .collect();

    // "Neuntes Buch Sozialgesetzbuch"
    for (ordinal, number) in ORDINALS {
        if compact.starts_with(ordinal) && compact.contains("buch") && compact.contains("sozialgesetzbuch") {
            return Some(format!("SGB-{}", ROMAN[number - 1]));
        }
    }

    let book = compact
        .strip_prefix("sozialgesetzbuchsgb")
        .or_else(|| compact.strip_prefix("sozialgesetzbuch"))
        .or_else(|| compact.strip_prefix("sgb"));

    if let Some(book) = book {
        return book_number(book).map(|n| format!("SGB-{}", ROMAN[n - 1]));
    }

    OTHER_CODES
        .iter()
        .find(|(surface, _)| *surface == compact)
        .map(|(_, code)| code.to_string())
}

fn book_number(book: &str) -> Option<usize> {
    if let Ok(n) = book.parse::<usize>() {
        return (1..=ROMAN.len()).contains(&n).then_some(n);
    }
    ROMAN
        .iter()
        .position(|r| r.to_lowercase() == book)
        .map(|idx| idx + 1)
}

/// Human-readable name for a canonical code ("SGB-IX" -> "SGB IX").
pub fn display_name(code: &str) -> String {
    code.replacen("SGB-", "SGB ", 1)
}

/// Full name and URL from the lookup table.
pub fn law_info(code: &str) -> Option<(&'static str, Option<&'static str>)> {
    LAW_INFO
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, name, url)| (*name, *url))
}

/// All law citations in `text`, in document order, overlaps removed.
pub fn find_law_mentions(text: &str) -> Vec<LawMention> {
    let spans: Vec<(usize, usize, String)> = LAW_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text))
        .filter_map(|m| canonical_law_code(m.as_str()).map(|code| (m.start(), m.end(), code)))
        .collect();

    non_overlapping(spans)
        .into_iter()
        .map(|(start, end, code)| LawMention { start, end, code })
        .collect()
}

pub struct LawExtractor;

impl EntityExtractor for LawExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Law
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        find_law_mentions(text)
            .into_iter()
            .map(|mention| {
                let (full_name, url) = match law_info(&mention.code) {
                    Some((name, url)) => (Some(name.to_string()), url.map(str::to_string)),
                    None => (None, None),
                };

                Entity::new(
                    EntityType::Law,
                    display_name(&mention.code),
                    EntityAttributes::Law {
                        code: mention.code.clone(),
                        full_name,
                        url,
                    },
                    document_id,
                    0.95,
                )
                .with_mention(mention.start, mention.end)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_codes() {
        assert_eq!(canonical_law_code("SGB IX").as_deref(), Some("SGB-IX"));
        assert_eq!(canonical_law_code("SGB-XII").as_deref(), Some("SGB-XII"));
        assert_eq!(canonical_law_code("Sozialgesetzbuch (SGB) IX").as_deref(), Some("SGB-IX"));
        assert_eq!(canonical_law_code("Neuntes Buch Sozialgesetzbuch").as_deref(), Some("SGB-IX"));
        assert_eq!(canonical_law_code("SGB 12").as_deref(), Some("SGB-XII"));
        assert_eq!(canonical_law_code("VwVfG").as_deref(), Some("VwVfG"));
        assert_eq!(canonical_law_code("SGB 15"), None);
        assert_eq!(canonical_law_code("Satzung"), None);
    }

    #[test]
    fn test_extract_variants_share_id() {
        let text = "Nach SGB IX und dem Sozialgesetzbuch IX sowie SGB-IX gilt Folgendes.";
        let entities = LawExtractor.extract(text, "doc-1");

        assert_eq!(entities.len(), 3);
        assert!(entities.iter().all(|e| e.id == entities[0].id));
        assert_eq!(entities[0].name, "SGB IX");
        assert_eq!(entities[0].confidence, 0.95);
    }

    #[test]
    fn test_lookup_table_attaches_metadata() {
        let entities = LawExtractor.extract("Leistungen nach dem SGB XII", "doc-1");

        assert_eq!(entities.len(), 1);
        match &entities[0].attributes {
            EntityAttributes::Law { code, full_name, url } => {
                assert_eq!(code, "SGB-XII");
                assert!(full_name.as_deref().unwrap_or_default().contains("Sozialhilfe"));
                assert!(url.is_some());
            }
            other => panic!("unexpected attributes {other:?}"),
        }
    }

    #[test]
    fn test_overlapping_patterns_keep_longest() {
        let mentions = find_law_mentions("Sozialgesetzbuch (SGB) IX");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].code, "SGB-IX");
    }
}
