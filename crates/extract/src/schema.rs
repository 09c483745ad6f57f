use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::normalizer::normalize_name;

/// Relation type names produced by the built-in strategies.
pub mod relation_types {
    pub const BELONGS_TO: &str = "belongs_to";
    pub const VERWEIST_AUF: &str = "verweist_auf";
    pub const ZUSTAENDIG_FUER: &str = "zuständig_für";
    pub const BETRIFFT: &str = "betrifft";
    pub const FRIST_FUER: &str = "frist_für";
    pub const MENTIONED_WITH: &str = "mentioned_with";
    pub const RICHTET_SICH_GEGEN: &str = "richtet_sich_gegen";
}

/// Entity category. Unknown names round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Law,
    Paragraph,
    Authority,
    Person,
    Date,
    Amount,
    Service,
    Procedure,
    CaseNumber,
    Decision,
    Objection,
    Other(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Law => "Law",
            EntityType::Paragraph => "Paragraph",
            EntityType::Authority => "Authority",
            EntityType::Person => "Person",
            EntityType::Date => "Date",
            EntityType::Amount => "Amount",
            EntityType::Service => "Service",
            EntityType::Procedure => "Procedure",
            EntityType::CaseNumber => "CaseNumber",
            EntityType::Decision => "Decision",
            EntityType::Objection => "Objection",
            EntityType::Other(name) => name,
        }
    }

    /// Parse an English or German type name.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "law" | "gesetz" => EntityType::Law,
            "paragraph" | "norm" => EntityType::Paragraph,
            "authority" | "behörde" | "behoerde" => EntityType::Authority,
            "person" => EntityType::Person,
            "date" | "datum" => EntityType::Date,
            "amount" | "betrag" => EntityType::Amount,
            "service" | "leistung" => EntityType::Service,
            "procedure" | "verfahren" => EntityType::Procedure,
            "casenumber" | "case_number" | "aktenzeichen" => EntityType::CaseNumber,
            "decision" | "bescheid" => EntityType::Decision,
            "objection" | "widerspruch" => EntityType::Objection,
            _ => EntityType::Other(name.trim().to_string()),
        }
    }

    /// Lowercase prefix used in entity IDs.
    pub fn slug(&self) -> String {
        match self {
            EntityType::CaseNumber => "case_number".to_string(),
            other => other.as_str().to_lowercase().replace(' ', "_"),
        }
    }

    /// Built-in types in declaration order.
    pub fn known() -> [EntityType; 11] {
        [
            EntityType::Law,
            EntityType::Paragraph,
            EntityType::Authority,
            EntityType::Person,
            EntityType::Date,
            EntityType::Amount,
            EntityType::Service,
            EntityType::Procedure,
            EntityType::CaseNumber,
            EntityType::Decision,
            EntityType::Objection,
        ]
    }
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        EntityType::parse(&value)
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorityKind {
    #[serde(rename = "Gericht")]
    Court,
    #[serde(rename = "Amt")]
    Office,
    #[serde(rename = "Kasse")]
    Fund,
    #[serde(rename = "Agentur")]
    Agency,
    #[serde(rename = "Sonstige")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCategory {
    #[serde(rename = "Rehabilitation")]
    Rehabilitation,
    #[serde(rename = "Teilhabe")]
    Participation,
    #[serde(rename = "Pflege")]
    Care,
    #[serde(rename = "Budget")]
    Budget,
    #[serde(rename = "Sonstige")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRole {
    Deadline,
    DecisionDate,
    ApplicationDate,
    ObjectionDate,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountPurpose {
    Budget,
    Cost,
    Reimbursement,
    Monthly,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CourtType {
    #[serde(rename = "Sozialgericht")]
    SocialCourt,
    #[serde(rename = "Landessozialgericht")]
    AppellateSocialCourt,
    #[serde(rename = "Bundessozialgericht")]
    FederalSocialCourt,
    #[serde(rename = "Verwaltungsgericht")]
    AdministrativeCourt,
    #[serde(rename = "Oberverwaltungsgericht")]
    HigherAdministrativeCourt,
    #[serde(rename = "Unbekannt")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    #[serde(rename = "Ablehnung")]
    Rejection,
    #[serde(rename = "Bewilligung")]
    Approval,
    #[serde(rename = "Widerspruchsbescheid")]
    ObjectionDecision,
    #[serde(rename = "Änderung")]
    Amendment,
    #[serde(rename = "Sonstige")]
    Other,
}

/// Statically typed attributes per entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityAttributes {
    Law {
        code: String,
        full_name: Option<String>,
        url: Option<String>,
    },
    Paragraph {
        number: String,
        law: String,
        title: String,
        context: String,
    },
    Authority {
        type_class: AuthorityKind,
        location: Option<String>,
    },
    Service {
        category: ServiceCategory,
    },
    Date {
        date: NaiveDate,
        date_type: DateRole,
    },
    Amount {
        value: f64,
        currency: String,
        purpose: AmountPurpose,
    },
    CaseNumber {
        court_code: String,
        court_type: CourtType,
        register: Option<String>,
    },
    Decision {
        decision_kind: DecisionKind,
        date: Option<NaiveDate>,
    },
    Procedure {
        category: String,
    },
    Person {
        salutation: Option<String>,
    },
    Objection {
        document_id: String,
        title: Option<String>,
        author: Option<String>,
    },
    #[default]
    None,
}

/// Byte span of one mention in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mention {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default)]
    pub attributes: EntityAttributes,
    /// Free-form extras such as `source_documents` and `mention_count`.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    pub source_document: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
}

impl Entity {
    pub fn new(
        entity_type: EntityType,
        name: impl Into<String>,
        attributes: EntityAttributes,
        source_document: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let name = name.into();
        let now = Utc::now();

        Self {
            id: entity_id(&entity_type, &name),
            entity_type,
            name,
            attributes,
            properties: BTreeMap::new(),
            source_document: source_document.into(),
            confidence: confidence.clamp(0.0, 1.0),
            created_at: now,
            updated_at: now,
            mentions: Vec::new(),
        }
    }

    pub fn with_mention(mut self, start: usize, end: usize) -> Self {
        self.mentions.push(Mention { start, end });
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Number of textual mentions behind this entity, at least 1.
    pub fn mention_count(&self) -> u64 {
        self.properties
            .get("mention_count")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| self.mentions.len().max(1) as u64)
    }

    /// Every document that contributed to this entity.
    pub fn source_documents(&self) -> Vec<String> {
        let mut docs: Vec<String> = self
            .properties
            .get("source_documents")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if !docs.contains(&self.source_document) {
            docs.insert(0, self.source_document.clone());
        }
        docs
    }

    /// Typed attributes and free-form extras as one flat map.
    pub fn properties_map(&self) -> Map<String, Value> {
        let mut map = match serde_json::to_value(&self.attributes) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.remove("kind");

        for (key, value) in &self.properties {
            map.insert(key.clone(), value.clone());
        }
        map
    }

    /// Look up a property by name, typed attributes first.
    pub fn property(&self, name: &str) -> Option<Value> {
        if name == "kind" {
            return self.properties.get(name).cloned();
        }
        self.properties_map().remove(name)
    }

    /// Canonical JSON projection.
    pub fn to_value(&self) -> Value {
        json!({
            "id": self.id,
            "type": self.entity_type.as_str(),
            "name": self.name,
            "properties": Value::Object(self.properties_map()),
            "source_document": self.source_document,
            "confidence": self.confidence,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    pub source_document: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relation {
    pub fn new(
        relation_type: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        source_document: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let relation_type = relation_type.into();
        let source_id = source_id.into();
        let target_id = target_id.into();
        let now = Utc::now();

        Self {
            id: relation_id(&relation_type, &source_id, &target_id),
            relation_type,
            source_id,
            target_id,
            properties: BTreeMap::new(),
            source_document: source_document.into(),
            confidence: confidence.clamp(0.0, 1.0),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Direction-insensitive identity used for deduplication.
    pub fn dedup_key(&self) -> (String, String, String) {
        let (low, high) = if self.source_id <= self.target_id {
            (&self.source_id, &self.target_id)
        } else {
            (&self.target_id, &self.source_id)
        };
        (self.relation_type.clone(), low.clone(), high.clone())
    }

    pub fn to_value(&self) -> Value {
        json!({
            "id": self.id,
            "type": self.relation_type,
            "source_id": self.source_id,
            "target_id": self.target_id,
            "properties": self.properties,
            "source_document": self.source_document,
            "confidence": self.confidence,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub doc_id: String,
    pub document_type: String,
    pub extraction: ExtractionResult,
}

fn short_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

/// Stable ID derived from `(type, normalized name)`.
pub fn entity_id(entity_type: &EntityType, name: &str) -> String {
    let normalized = normalize_name(name, entity_type);
    format!(
        "{}_{}",
        entity_type.slug(),
        short_hash(&[entity_type.as_str(), &normalized])
    )
}

/// Stable ID derived from `(type, source, target)`.
pub fn relation_id(relation_type: &str, source_id: &str, target_id: &str) -> String {
    format!("rel_{}", short_hash(&[relation_type, source_id, target_id]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_aliases() {
        assert_eq!(EntityType::parse("Gesetz"), EntityType::Law);
        assert_eq!(EntityType::parse("law"), EntityType::Law);
        assert_eq!(EntityType::parse("Behörde"), EntityType::Authority);
        assert_eq!(
            EntityType::parse("Gutachter"),
            EntityType::Other("Gutachter".to_string())
        );
    }

    #[test]
    fn test_entity_type_serde_as_string() {
        let json = serde_json::to_string(&EntityType::CaseNumber).unwrap();
        assert_eq!(json, "\"CaseNumber\"");

        let back: EntityType = serde_json::from_str("\"Aktenzeichen\"").unwrap();
        assert_eq!(back, EntityType::CaseNumber);
    }

    #[test]
    fn test_property_projection() {
        let entity = Entity::new(
            EntityType::Authority,
            "Sozialamt München",
            EntityAttributes::Authority {
                type_class: AuthorityKind::Office,
                location: Some("München".to_string()),
            },
            "doc-1",
            0.9,
        )
        .with_property("mention_count", 3);

        assert_eq!(entity.property("type_class"), Some(json!("Amt")));
        assert_eq!(entity.property("location"), Some(json!("München")));
        assert_eq!(entity.mention_count(), 3);
        assert!(entity.property("kind").is_none());

        let value = entity.to_value();
        assert_eq!(value["type"], "Authority");
        assert_eq!(value["properties"]["type_class"], "Amt");
    }

    #[test]
    fn test_ids_follow_normalized_name() {
        let a = entity_id(&EntityType::Law, "SGB IX");
        let b = entity_id(&EntityType::Law, "SGB-IX");
        let c = entity_id(&EntityType::Law, "SGB XII");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("law_"));
    }

    #[test]
    fn test_dedup_key_ignores_direction() {
        let r1 = Relation::new("mentioned_with", "a", "b", "doc", 0.6);
        let r2 = Relation::new("mentioned_with", "b", "a", "doc", 0.6);

        assert_eq!(r1.dedup_key(), r2.dedup_key());
        assert_ne!(r1.id, r2.id);
    }

    #[test]
    fn test_source_documents_includes_primary() {
        let entity = Entity::new(EntityType::Law, "BGB", EntityAttributes::None, "doc-a", 0.9)
            .with_property("source_documents", json!(["doc-b"]));

        assert_eq!(entity.source_documents(), vec!["doc-a", "doc-b"]);
    }
}
