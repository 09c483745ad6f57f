use regex::Regex;
use std::sync::LazyLock;

use super::{EntityExtractor, canonical_term, compile_vocabulary};
use crate::schema::{Entity, EntityAttributes, EntityType, ServiceCategory};
use crate::text::classify_by_keyword;

const KNOWN_SERVICES: &[&str] = &[
    "Persönliches Budget",
    "Budget für Arbeit",
    "Eingliederungshilfe",
    "Assistenzleistungen",
    "Arbeitsassistenz",
    "Schulbegleitung",
    "Soziale Teilhabe",
    "Teilhabe am Arbeitsleben",
    "Teilhabe an Bildung",
    "Leistungen zur Teilhabe",
    "Medizinische Rehabilitation",
    "Berufliche Rehabilitation",
    "Frühförderung",
    "Pflegegeld",
    "Pflegesachleistung",
    "Hilfe zur Pflege",
    "Verhinderungspflege",
    "Kurzzeitpflege",
    "Hilfsmittel",
    "Grundsicherung",
    "Bürgergeld",
    "Wohngeld",
];

static VOCABULARY: LazyLock<Regex> = LazyLock::new(|| compile_vocabulary(KNOWN_SERVICES));

const CATEGORY_KEYWORDS: &[(&str, ServiceCategory)] = &[
    ("rehabilitation", ServiceCategory::Rehabilitation),
    ("teilhabe", ServiceCategory::Participation),
    ("eingliederung", ServiceCategory::Participation),
    ("assistenz", ServiceCategory::Participation),
    ("schulbegleitung", ServiceCategory::Participation),
    ("pflege", ServiceCategory::Care),
    ("budget", ServiceCategory::Budget),
];

pub fn classify_service(name: &str) -> ServiceCategory {
    classify_by_keyword(&name.to_lowercase(), CATEGORY_KEYWORDS, ServiceCategory::Other)
}

pub struct ServiceExtractor;

impl EntityExtractor for ServiceExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Service
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        VOCABULARY
            .find_iter(text)
            .filter_map(|m| {
                let name = canonical_term(KNOWN_SERVICES, m.as_str())?;
                Some(
                    Entity::new(
                        EntityType::Service,
                        name,
                        EntityAttributes::Service {
                            category: classify_service(name),
                        },
                        document_id,
                        0.85,
                    )
                    .with_mention(m.start(), m.end()),
                )
            })
            .collect()
    }
}
