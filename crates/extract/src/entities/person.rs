use regex::Regex;
use std::sync::LazyLock;

use super::{EntityExtractor, NAME_STOPWORDS, compile_patterns};
use crate::schema::{Entity, EntityAttributes, EntityType};

static PERSON_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"\b(?P<salutation>Herrn?|Frau)\s+(?P<titles>(?:(?:Dr|Prof)\.\s*)*)(?P<name>[A-ZÄÖÜ][a-zäöüß]+(?:-[A-ZÄÖÜ][a-zäöüß]+)?)",
        r"\b(?P<titles>(?:(?:Dr|Prof)\.\s*)+)(?P<name>[A-ZÄÖÜ][a-zäöüß]+(?:-[A-ZÄÖÜ][a-zäöüß]+)?)",
    ])
});

pub struct PersonExtractor;

impl EntityExtractor for PersonExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Person
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let mut covered: Vec<(usize, usize)> = Vec::new();
        let mut entities = Vec::new();

        for pattern in PERSON_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                    continue;
                };
                if NAME_STOPWORDS.contains(&name.as_str())
                    || covered.iter().any(|&(s, e)| whole.start() < e && s < whole.end())
                {
                    continue;
                }

                // "Herrn" is the dative of "Herr"
                let salutation = caps.name("salutation").map(|m| match m.as_str() {
                    "Herrn" => "Herr".to_string(),
                    other => other.to_string(),
                });
                let titles = caps
                    .name("titles")
                    .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
                    .unwrap_or_default();

                let display = [salutation.clone().unwrap_or_default(), titles, name.as_str().to_string()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");

                covered.push((whole.start(), whole.end()));
                entities.push(
                    Entity::new(
                        EntityType::Person,
                        display,
                        EntityAttributes::Person { salutation },
                        document_id,
                        0.7,
                    )
                    .with_mention(whole.start(), whole.end()),
                );
            }
        }

        entities.sort_by_key(|e| e.mentions.first().map(|m| m.start));
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salutation_and_title() {
        let text = "Frau Dr. Schmidt vertritt Herrn Müller-Lüdenscheidt.";
        let entities = PersonExtractor.extract(text, "doc-1");
        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["Frau Dr. Schmidt", "Herr Müller-Lüdenscheidt"]);
        assert_eq!(entities[1].property("salutation"), Some(serde_json::json!("Herr")));
        assert_eq!(entities[0].confidence, 0.7);
    }

    #[test]
    fn test_title_only() {
        let entities = PersonExtractor.extract("Gutachten von Prof. Dr. Weber", "doc-1");

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "Prof. Dr. Weber");
        assert_eq!(entities[0].property("salutation"), Some(serde_json::Value::Null));
    }

    #[test]
    fn test_articles_are_not_names() {
        assert!(PersonExtractor.extract("Frau Die", "doc-1").is_empty());
    }
}
