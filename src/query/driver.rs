//! Request driver: prefix and entity checks, creation, then the step loop.

use super::{EntityObjectQueryHandler, QueryHandler, Step};
use crate::config::Registry;
use crate::error::ApiError;
use crate::object::EntityObject;
use crate::response::ApiResult;
use axum::http::Method;
use serde_json::Value;
use std::sync::Arc;

/// Literal first segment every resource path carries.
pub const ENTITIES_PREFIX: &str = "entities";

/// Split a request path into non-empty segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve `/entities/<Entity>[/<id>[/...]]` to a terminal result.
///
/// `PUT /entities/<Entity>` creates; every other request needs an id and is walked
/// one handler at a time, so path depth never grows the stack.
pub async fn resolve_request(
    registry: &Arc<Registry>,
    path: &str,
    verb: &Method,
    body: Value,
) -> Result<ApiResult, ApiError> {
    let segments = split_path(path);
    let rest = match segments.split_first() {
        Some((prefix, rest)) if prefix == ENTITIES_PREFIX => rest,
        _ => return Err(ApiError::EntitiesPrefixMissing(ENTITIES_PREFIX.into())),
    };
    let (name, rest) = rest.split_first().ok_or(ApiError::InvalidRequestPath)?;
    let entity = registry.require(name)?;

    if verb == Method::PUT {
        if !rest.is_empty() {
            return Err(ApiError::InvalidPutUsage);
        }
        return Ok(ApiResult::ok(entity.create(body).await?));
    }

    let id = rest.first().ok_or(ApiError::InvalidRequestPath)?;
    let mut handler: Box<dyn QueryHandler> = Box::new(EntityObjectQueryHandler::new(
        EntityObject::new(id.as_str(), entity),
        registry.clone(),
    ));
    let mut path: &[String] = rest;
    loop {
        match handler.step(path, verb, &body).await? {
            Step::Done(result) => return Ok(result),
            Step::Continue(next, remaining) => {
                handler = next;
                path = remaining;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, MethodTable, SchemaConfig};
    use crate::hooks::FnMethod;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        registry: Arc<Registry>,
        calls: Arc<AtomicUsize>,
    }

    async fn fixture() -> Fixture {
        let cfg: SchemaConfig = serde_json::from_value(json!({ "entities": [
            { "name": "User",
              "members": {
                "name": { "kind": "primitive", "type": "string", "variable": true },
                "born": { "kind": "primitive", "type": "date" },
                "tags": { "kind": "array", "element": { "kind": "primitive", "type": "string" } },
                "pets": { "kind": "array", "element": { "kind": "reference", "type": "Pet" } },
                "best_friend": { "kind": "reference", "type": "User" }
              },
              "methods": ["greet"] },
            { "name": "Pet",
              "members": { "name": { "kind": "primitive", "type": "string" },
                           "owner": { "kind": "reference", "type": "User" } },
              "default_include": { "id": true, "name": true } }
        ]}))
        .unwrap();
        let store = Arc::new(MemoryStore::new(&cfg));
        store
            .seed(json!({
                "User": {
                    "42": { "name": "ann", "born": "1990-01-01", "tags": ["x"], "pets": ["p7", "p8"], "best_friend": "43" },
                    "43": { "name": "bob", "pets": [] }
                },
                "Pet": {
                    "p7": { "name": "rex", "owner": "42" },
                    "p8": { "name": "tom", "owner": "42" },
                    "p9": { "name": "kit", "owner": "43" }
                }
            }))
            .await
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let greet = FnMethod(move |id: String, body: Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ApiError>(json!({ "greeted": id, "with": body })) }
        });
        let registry = resolve(&cfg, store, MethodTable::new().bind("User", "greet", greet)).unwrap();
        Fixture {
            registry: Arc::new(registry),
            calls,
        }
    }

    async fn run(f: &Fixture, verb: Method, path: &str, body: Value) -> Result<ApiResult, ApiError> {
        resolve_request(&f.registry, path, &verb, body).await
    }

    #[tokio::test]
    async fn get_walks_user_pets_index_to_pet() {
        let f = fixture().await;
        let res = run(&f, Method::GET, "/entities/User/42/pets/0", Value::Null).await.unwrap();
        assert_eq!(res.status_code, StatusCode::OK);
        assert_eq!(res.payload, Some(json!({ "id": "p7", "name": "rex" })));
    }

    #[tokio::test]
    async fn index_follows_array_mutation() {
        let f = fixture().await;
        let res = run(&f, Method::GET, "/entities/User/42/pets/0/name", Value::Null).await.unwrap();
        assert_eq!(res.payload, Some(json!({ "value": "rex" })));

        run(&f, Method::POST, "/entities/User/42", json!({ "pets": ["p9", "p7"] }))
            .await
            .unwrap();
        let res = run(&f, Method::GET, "/entities/User/42/pets/0", Value::Null).await.unwrap();
        assert_eq!(res.payload, Some(json!({ "id": "p9", "name": "kit" })));
        let res = run(&f, Method::GET, "/entities/User/42/pets/1/name", Value::Null).await.unwrap();
        assert_eq!(res.payload, Some(json!({ "value": "rex" })));
    }

    #[tokio::test]
    async fn get_entity_uses_default_include() {
        let f = fixture().await;
        let user = f.registry.require("User").unwrap();
        let expected = user.fetch("42", &user.default_include).await.unwrap();
        let res = run(&f, Method::GET, "/entities/User/42", Value::Null).await.unwrap();
        assert_eq!(res, ApiResult::ok(expected));
    }

    #[tokio::test]
    async fn reference_member_descends_into_target() {
        let f = fixture().await;
        let res = run(&f, Method::GET, "/entities/Pet/p8/owner/best_friend/name", Value::Null)
            .await
            .unwrap();
        assert_eq!(res.payload, Some(json!({ "value": "bob" })));
    }

    #[tokio::test]
    async fn methods_accept_post_only_and_run_once() {
        let f = fixture().await;
        for verb in [Method::GET, Method::DELETE] {
            let err = run(&f, verb, "/entities/User/42/greet", Value::Null).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);

        let res = run(&f, Method::POST, "/entities/User/42/greet", json!({ "loud": true }))
            .await
            .unwrap();
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            res,
            ApiResult::ok(json!({ "greeted": "42", "with": { "loud": true } }))
        );
    }

    #[tokio::test]
    async fn primitive_members_read_and_vary() {
        let f = fixture().await;
        let res = run(&f, Method::GET, "/entities/User/42/name", Value::Null).await.unwrap();
        assert_eq!(res.payload, Some(json!({ "value": "ann" })));

        let res = run(&f, Method::POST, "/entities/User/42/name", json!({ "name": "anna" }))
            .await
            .unwrap();
        assert_eq!(res, ApiResult::default());
        let res = run(&f, Method::GET, "/entities/User/42/name", Value::Null).await.unwrap();
        assert_eq!(res.payload, Some(json!({ "value": "anna" })));

        for body in [json!({ "born": "2000-01-01" }), Value::Null, json!([])] {
            let err = run(&f, Method::POST, "/entities/User/42/born", body).await.unwrap_err();
            assert!(matches!(err, ApiError::TryingToVariateNotVariableMember { .. }));
        }

        let err = run(&f, Method::DELETE, "/entities/User/42/name", Value::Null).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        let err = run(&f, Method::GET, "/entities/User/42/name/more", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequestPath));
    }

    #[tokio::test]
    async fn unknown_segment_names_entity_and_segment() {
        let f = fixture().await;
        let err = run(&f, Method::GET, "/entities/User/42/nickname", Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Entity User has no member or method member nickname.");
    }

    #[tokio::test]
    async fn array_index_failures() {
        let f = fixture().await;
        let err = run(&f, Method::GET, "/entities/User/42/pets/9", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::MemberOrMethodNotFound { .. }));
        let err = run(&f, Method::GET, "/entities/User/42/pets/first", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::IndexIsNaN(_)));
        let err = run(&f, Method::GET, "/entities/User/43/pets/0", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::MemberOrMethodNotFound { .. }));
    }

    #[tokio::test]
    async fn whole_arrays_and_primitive_elements() {
        let f = fixture().await;
        let res = run(&f, Method::GET, "/entities/User/42/pets", Value::Null).await.unwrap();
        assert_eq!(
            res.payload,
            Some(json!({ "value": [{ "id": "p7", "name": "rex" }, { "id": "p8", "name": "tom" }] }))
        );
        let res = run(&f, Method::GET, "/entities/User/42/tags/0", Value::Null).await.unwrap();
        assert_eq!(res.payload, Some(json!({ "value": "x" })));
        let err = run(&f, Method::POST, "/entities/User/42/tags", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequestPath));
    }

    #[tokio::test]
    async fn entity_level_post_and_delete() {
        let f = fixture().await;
        let res = run(&f, Method::POST, "/entities/Pet/p7", json!({ "name": "max" })).await.unwrap();
        assert_eq!(res.payload.unwrap()["name"], "max");

        run(&f, Method::DELETE, "/entities/Pet/p8", Value::Null).await.unwrap();
        let err = run(&f, Method::GET, "/entities/Pet/p8", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidEntityId { .. }));
        // The array still lists p8; resolving it now points at a missing instance.
        let err = run(&f, Method::GET, "/entities/User/42/pets/1", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidEntityId { .. }));

        let err = run(&f, Method::PATCH, "/entities/Pet/p7", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequestPath));
    }

    #[tokio::test]
    async fn driver_prefix_name_and_put_rules() {
        let f = fixture().await;
        let err = run(&f, Method::GET, "/users/42", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::EntitiesPrefixMissing(_)));
        let err = run(&f, Method::GET, "/", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::EntitiesPrefixMissing(_)));
        let err = run(&f, Method::GET, "/entities/Cat/1", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidEntityName(ref n) if n == "Cat"));
        let err = run(&f, Method::GET, "/entities/User", Value::Null).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequestPath));
        let err = run(&f, Method::PUT, "/entities/User/42", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidPutUsage));

        let res = run(&f, Method::PUT, "/entities/Pet", json!({ "id": "p10", "name": "max" }))
            .await
            .unwrap();
        assert_eq!(res.payload.unwrap()["id"], "p10");
        let res = run(&f, Method::GET, "/entities/Pet/p10/name", Value::Null).await.unwrap();
        assert_eq!(res.payload, Some(json!({ "value": "max" })));
        let err = run(&f, Method::PUT, "/entities/Pet", json!({ "id": "p9", "name": "kit" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCreatorArguments));
    }

    #[test]
    fn split_drops_empty_segments() {
        assert_eq!(split_path("//entities/User/42/"), vec!["entities", "User", "42"]);
        assert!(split_path("").is_empty());
    }
}
