use regex::Regex;
use std::sync::LazyLock;

use super::{EntityExtractor, compile_patterns};
use crate::schema::{CourtType, Entity, EntityAttributes, EntityType};
use crate::text::collapse_whitespace;

// "Az. S 12 SO 123/23", "Aktenzeichen: L 8 SO 45/22", "VG 5 K 123/21"
static CASE_NUMBER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?:\b(?:Az\.|Aktenzeichen)\s*:?\s*)?\b(?P<court>[A-Z]{1,3})\s+(?:(?P<chamber>\d{1,3})\s+)?(?:(?P<register>[A-Z]{1,2}[a-z]?)\s+)?(?P<number>\d{1,5}/\d{2,4})\b",
    ])
});

const COURT_CODES: &[(&str, CourtType)] = &[
    ("S", CourtType::SocialCourt),
    ("L", CourtType::AppellateSocialCourt),
    ("B", CourtType::FederalSocialCourt),
    ("VG", CourtType::AdministrativeCourt),
    ("OVG", CourtType::HigherAdministrativeCourt),
];

pub fn court_type(code: &str) -> CourtType {
    COURT_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, court)| *court)
        .unwrap_or(CourtType::Unknown)
}

pub struct CaseNumberExtractor;

impl EntityExtractor for CaseNumberExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::CaseNumber
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let mut entities = Vec::new();

        for pattern in CASE_NUMBER_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let (Some(whole), Some(court), Some(number)) =
                    (caps.get(0), caps.name("court"), caps.name("number"))
                else {
                    continue;
                };

                // Name excludes the "Az." prefix so prefixed and bare forms converge
                let name = collapse_whitespace(&text[court.start()..number.end()]);
                let register = caps.name("register").map(|m| m.as_str().to_string());

                entities.push(
                    Entity::new(
                        EntityType::CaseNumber,
                        name,
                        EntityAttributes::CaseNumber {
                            court_code: court.as_str().to_string(),
                            court_type: court_type(court.as_str()),
                            register,
                        },
                        document_id,
                        0.9,
                    )
                    .with_mention(whole.start(), whole.end()),
                );
            }
        }

        entities
    }
}
