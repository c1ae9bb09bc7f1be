//! Schema validation: identifiers, member/method disjointness, reference integrity, include shape.

use crate::config::{EntityConfig, Include, IncludeEntry, Member, SchemaConfig};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Segment-safe identifier: entity, member and method names all travel as path segments.
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Key every projection may name; it is the instance identity, never a declared member.
pub const ID_KEY: &str = "id";

pub fn validate(config: &SchemaConfig) -> Result<(), ConfigError> {
    let ident = Regex::new(IDENTIFIER_PATTERN).map_err(|e| ConfigError::Load(e.to_string()))?;

    let mut by_name: HashMap<&str, &EntityConfig> = HashMap::new();
    for e in &config.entities {
        if !ident.is_match(&e.name) {
            return Err(ConfigError::InvalidIdentifier(e.name.clone()));
        }
        if by_name.insert(e.name.as_str(), e).is_some() {
            return Err(ConfigError::DuplicateEntity(e.name.clone()));
        }
    }

    for e in &config.entities {
        for name in e.members.keys().chain(e.methods.iter()) {
            if !ident.is_match(name) || name == ID_KEY {
                return Err(ConfigError::InvalidIdentifier(format!("{}.{}", e.name, name)));
            }
        }

        let mut methods = HashSet::new();
        for m in &e.methods {
            if e.members.contains_key(m) || !methods.insert(m.as_str()) {
                return Err(ConfigError::MemberMethodOverlap {
                    entity: e.name.clone(),
                    name: m.clone(),
                });
            }
        }

        for (member_name, member) in &e.members {
            if let Some(type_name) = member.referenced_type() {
                if !by_name.contains_key(type_name) {
                    return Err(ConfigError::UnknownReference {
                        entity: e.name.clone(),
                        member: member_name.clone(),
                        type_name: type_name.to_string(),
                    });
                }
            }
        }

        if let Some(inc) = &e.default_include {
            validate_include(e, inc, &by_name)?;
        }
    }

    Ok(())
}

/// Every key must be `id` or a member of `entity`; nesting only below reference members.
fn validate_include(
    entity: &EntityConfig,
    include: &Include,
    by_name: &HashMap<&str, &EntityConfig>,
) -> Result<(), ConfigError> {
    for (key, entry) in include.iter() {
        let bad_key = || ConfigError::UnknownIncludeKey {
            entity: entity.name.clone(),
            key: key.clone(),
        };
        if key == ID_KEY {
            if *entry != IncludeEntry::All {
                return Err(bad_key());
            }
            continue;
        }
        let member = entity.members.get(key).ok_or_else(bad_key)?;
        if let IncludeEntry::Nested(nested) = entry {
            let target = match member {
                Member::Primitive { .. } => return Err(bad_key()),
                _ => member
                    .referenced_type()
                    .and_then(|t| by_name.get(t))
                    .ok_or_else(bad_key)?,
            };
            validate_include(target, nested, by_name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(v: serde_json::Value) -> SchemaConfig {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn accepts_user_pet_graph() {
        let cfg = schema(json!({ "entities": [
            { "name": "User", "members": {
                "name": { "kind": "primitive", "type": "string", "variable": true },
                "pets": { "kind": "array", "element": { "kind": "reference", "type": "Pet" } }
              },
              "methods": ["greet"],
              "default_include": { "id": true, "pets": { "name": true } } },
            { "name": "Pet", "members": { "name": { "kind": "primitive", "type": "string" } } }
        ]}));
        validate(&cfg).unwrap();
    }

    #[test]
    fn rejects_member_method_overlap() {
        let cfg = schema(json!({ "entities": [
            { "name": "User", "members": { "name": { "kind": "primitive", "type": "string" } },
              "methods": ["name"] }
        ]}));
        assert!(matches!(validate(&cfg), Err(ConfigError::MemberMethodOverlap { .. })));
    }

    #[test]
    fn rejects_dangling_reference() {
        let cfg = schema(json!({ "entities": [
            { "name": "User", "members": { "cat": { "kind": "reference", "type": "Cat" } } }
        ]}));
        assert!(matches!(validate(&cfg), Err(ConfigError::UnknownReference { ref type_name, .. }) if type_name == "Cat"));
    }

    #[test]
    fn rejects_include_key_outside_members() {
        let cfg = schema(json!({ "entities": [
            { "name": "User", "members": { "name": { "kind": "primitive", "type": "string" } },
              "default_include": { "age": true } }
        ]}));
        assert!(matches!(validate(&cfg), Err(ConfigError::UnknownIncludeKey { ref key, .. }) if key == "age"));
    }

    #[test]
    fn rejects_nested_include_on_primitive() {
        let cfg = schema(json!({ "entities": [
            { "name": "User", "members": { "name": { "kind": "primitive", "type": "string" } },
              "default_include": { "name": { "id": true } } }
        ]}));
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn rejects_reserved_and_malformed_names() {
        let cfg = schema(json!({ "entities": [
            { "name": "User", "members": { "id": { "kind": "primitive", "type": "string" } } }
        ]}));
        assert!(matches!(validate(&cfg), Err(ConfigError::InvalidIdentifier(_))));

        let cfg = schema(json!({ "entities": [{ "name": "bad/name" }] }));
        assert!(matches!(validate(&cfg), Err(ConfigError::InvalidIdentifier(_))));
    }
}
