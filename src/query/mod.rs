//! Path resolution: one handler per context, driven step by step until a terminal result.

mod array;
mod driver;
mod entity;

pub use array::ArrayQueryHandler;
pub use driver::{resolve_request, split_path, ENTITIES_PREFIX};
pub use entity::EntityObjectQueryHandler;

use crate::error::ApiError;
use crate::response::ApiResult;
use async_trait::async_trait;
use axum::http::Method;
use serde_json::Value;

/// Outcome of one resolution step.
pub enum Step<'p> {
    Done(ApiResult),
    /// Hand the remaining path to a narrower context. `path[0]` identifies that context.
    Continue(Box<dyn QueryHandler>, &'p [String]),
}

/// Resolves the leading path segment against one context. Single use: `step` consumes the handler.
///
/// `path[0]` is the segment that identified this context; handlers consume it before
/// branching on the remainder.
#[async_trait]
pub trait QueryHandler: Send {
    async fn step<'p>(
        self: Box<Self>,
        path: &'p [String],
        verb: &Method,
        body: &Value,
    ) -> Result<Step<'p>, ApiError>;
}
