use regex::Regex;
use std::sync::LazyLock;

use super::{
    EntityExtractor, NAME_STOPWORDS, canonical_term, compile_patterns, compile_vocabulary,
};
use crate::schema::{AuthorityKind, Entity, EntityAttributes, EntityType};
use crate::text::classify_by_keyword;

const KNOWN_AUTHORITIES: &[&str] = &[
    "Sozialamt",
    "Jugendamt",
    "Versorgungsamt",
    "Integrationsamt",
    "Gesundheitsamt",
    "Landratsamt",
    "Jobcenter",
    "Agentur für Arbeit",
    "Bundesagentur für Arbeit",
    "Arbeitsagentur",
    "Deutsche Rentenversicherung",
    "Krankenkasse",
    "Pflegekasse",
    "Berufsgenossenschaft",
    "Träger der Eingliederungshilfe",
    "Eingliederungshilfeträger",
    "Landschaftsverband",
    "Sozialgericht",
    "Landessozialgericht",
    "Bundessozialgericht",
    "Verwaltungsgericht",
];

static VOCABULARY: LazyLock<Regex> = LazyLock::new(|| compile_vocabulary(KNOWN_AUTHORITIES));

// "Sozialamt München", "Landessozialgericht Baden-Württemberg"
static TYPE_LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"\b([A-ZÄÖÜ][a-zäöüß]*(?:amt|gericht|kasse|agentur|behörde))\s+([A-ZÄÖÜ][a-zäöüß]+(?:-[A-ZÄÖÜ][a-zäöüß]+)?)",
    ])
});

const KIND_KEYWORDS: &[(&str, AuthorityKind)] = &[
    ("gericht", AuthorityKind::Court),
    ("amt", AuthorityKind::Office),
    ("kasse", AuthorityKind::Fund),
    ("agentur", AuthorityKind::Agency),
];

pub fn classify_authority(name: &str) -> AuthorityKind {
    classify_by_keyword(&name.to_lowercase(), KIND_KEYWORDS, AuthorityKind::Other)
}

pub struct AuthorityExtractor;

impl AuthorityExtractor {
    fn build(name: String, location: Option<String>, document_id: &str, confidence: f64) -> Entity {
        Entity::new(
            EntityType::Authority,
            name.clone(),
            EntityAttributes::Authority {
                type_class: classify_authority(&name),
                location,
            },
            document_id,
            confidence,
        )
    }
}

impl EntityExtractor for AuthorityExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Authority
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut pattern_spans: Vec<(usize, usize)> = Vec::new();

        for pattern in TYPE_LOCATION_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let (Some(whole), Some(kind), Some(location)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                if NAME_STOPWORDS.contains(&location.as_str()) {
                    continue;
                }

                let name = format!("{} {}", kind.as_str(), location.as_str());
                entities.push(
                    Self::build(name, Some(location.as_str().to_string()), document_id, 0.9)
                        .with_mention(whole.start(), whole.end()),
                );
                pattern_spans.push((whole.start(), whole.end()));
            }
        }

        for m in VOCABULARY.find_iter(text) {
            // Already covered by a more specific "Type Location" match
            if pattern_spans
                .iter()
                .any(|&(start, end)| m.start() < end && start < m.end())
            {
                continue;
            }
            let Some(name) = canonical_term(KNOWN_AUTHORITIES, m.as_str()) else {
                continue;
            };
            entities.push(
                Self::build(name.to_string(), None, document_id, 0.85).with_mention(m.start(), m.end()),
            );
        }

        entities.sort_by_key(|e| e.mentions.first().map(|m| m.start));
        entities
    }
}
