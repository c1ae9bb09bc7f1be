//! Raw schema declaration types matching the JSON schema file.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Member kinds. Arrays wrap an element member; references name another entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Member {
    Primitive {
        #[serde(rename = "type")]
        type_name: String,
        #[serde(rename = "variable", default)]
        is_variable: bool,
    },
    Array {
        element: Box<Member>,
    },
    Reference {
        #[serde(rename = "type")]
        type_name: String,
    },
}

impl Member {
    pub fn primitive(type_name: &str, is_variable: bool) -> Self {
        Member::Primitive {
            type_name: type_name.to_string(),
            is_variable,
        }
    }

    pub fn array(element: Member) -> Self {
        Member::Array {
            element: Box::new(element),
        }
    }

    pub fn reference(type_name: &str) -> Self {
        Member::Reference {
            type_name: type_name.to_string(),
        }
    }

    /// Entity type this member points at, directly or as array element.
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            Member::Reference { type_name } => Some(type_name),
            Member::Array { element } => element.referenced_type(),
            Member::Primitive { .. } => None,
        }
    }
}

/// One projection entry: the whole member, or a nested projection of the referenced entity.
#[derive(Clone, Debug, PartialEq)]
pub enum IncludeEntry {
    All,
    Nested(Include),
}

/// Recursive projection spec: member name -> `true` | nested include.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Include(BTreeMap<String, IncludeEntry>);

impl Include {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{ id: true }`, the cheapest valid projection.
    pub fn id_only() -> Self {
        Self::new().with("id", IncludeEntry::All)
    }

    pub fn single(name: &str, entry: IncludeEntry) -> Self {
        Self::new().with(name, entry)
    }

    pub fn with(mut self, name: &str, entry: IncludeEntry) -> Self {
        self.0.insert(name.to_string(), entry);
        self
    }

    pub fn get(&self, name: &str) -> Option<&IncludeEntry> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IncludeEntry)> {
        self.0.iter()
    }
}

impl Serialize for IncludeEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            IncludeEntry::All => serializer.serialize_bool(true),
            IncludeEntry::Nested(inc) => inc.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for IncludeEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::Bool(true) => Ok(IncludeEntry::All),
            serde_json::Value::Object(_) => serde_json::from_value::<Include>(v)
                .map(IncludeEntry::Nested)
                .map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!(
                "include entry must be true or a nested include object; got {}",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    #[serde(default)]
    pub members: BTreeMap<String, Member>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub default_include: Option<Include>,
}

impl EntityConfig {
    /// Declared default projection, or `id` plus every member (references as `{ id: true }`).
    pub fn effective_default_include(&self) -> Include {
        if let Some(inc) = &self.default_include {
            return inc.clone();
        }
        self.members
            .iter()
            .fold(Include::id_only(), |inc, (name, member)| match member {
                Member::Reference { .. } => inc.with(name, IncludeEntry::Nested(Include::id_only())),
                _ => inc.with(name, IncludeEntry::All),
            })
    }
}

/// Whole schema declaration in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub entities: Vec<EntityConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_kinds_deserialize_from_tagged_json() {
        let m: Member = serde_json::from_value(json!({
            "kind": "array",
            "element": { "kind": "reference", "type": "Pet" }
        }))
        .unwrap();
        assert_eq!(m, Member::array(Member::reference("Pet")));
        assert_eq!(m.referenced_type(), Some("Pet"));

        let p: Member = serde_json::from_value(json!({ "kind": "primitive", "type": "string" })).unwrap();
        assert_eq!(p, Member::primitive("string", false));
    }

    #[test]
    fn include_rejects_false_entries() {
        let ok: Include = serde_json::from_value(json!({ "id": true, "owner": { "name": true } })).unwrap();
        assert_eq!(
            ok,
            Include::id_only().with("owner", IncludeEntry::Nested(Include::single("name", IncludeEntry::All)))
        );
        assert!(serde_json::from_value::<Include>(json!({ "id": false })).is_err());
    }

    #[test]
    fn default_include_covers_every_member() {
        let cfg: EntityConfig = serde_json::from_value(json!({
            "name": "User",
            "members": {
                "name": { "kind": "primitive", "type": "string" },
                "best_friend": { "kind": "reference", "type": "User" }
            }
        }))
        .unwrap();
        let inc = cfg.effective_default_include();
        assert_eq!(inc.get("id"), Some(&IncludeEntry::All));
        assert_eq!(inc.get("name"), Some(&IncludeEntry::All));
        assert_eq!(inc.get("best_friend"), Some(&IncludeEntry::Nested(Include::id_only())));
    }
}
