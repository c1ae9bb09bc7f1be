//! Entity REST: schema-driven resolution of resource paths onto CRUD hooks and methods.

pub mod config;
pub mod error;
pub mod hooks;
pub mod object;
pub mod query;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;

pub use config::{load_schema, resolve, Entity, Include, IncludeEntry, Member, MethodTable, Registry, SchemaConfig, ServerConfig};
pub use error::{ApiError, ConfigError};
pub use hooks::{EntityMethod, EntityStore, FnMethod};
pub use object::{ArrayObject, EntityObject};
pub use query::{resolve_request, ArrayQueryHandler, EntityObjectQueryHandler, QueryHandler, Step, ENTITIES_PREFIX};
pub use response::ApiResult;
pub use routes::{common_routes, entity_routes};
pub use state::AppState;
pub use store::MemoryStore;
