//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("entity {entity}: '{name}' is declared both as member and method")]
    MemberMethodOverlap { entity: String, name: String },
    #[error("entity {entity}: member {member} references unknown entity {type_name}")]
    UnknownReference {
        entity: String,
        member: String,
        type_name: String,
    },
    #[error("entity {entity}: include key '{key}' is not a member")]
    UnknownIncludeKey { entity: String, key: String },
    #[error("entity {entity}: method {method} has no implementation bound")]
    UnboundMethod { entity: String, method: String },
    #[error("config load: {0}")]
    Load(String),
}

/// Failures raised while resolving a request path. Each variant carries the
/// transport status it maps to (see [`ApiError::status_code`]).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    MethodNotAllowed(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to find object with id {id} of the entity {entity}.")]
    InvalidEntityId { id: String, entity: String },
    #[error("It's allowed to use PUT method only for creating new objects.")]
    InvalidPutUsage,
    #[error("\"/{0}/\" prefix is missing. Each api request path must start with this prefix.")]
    EntitiesPrefixMissing(String),
    #[error("Failed to find entity {0}.")]
    InvalidEntityName(String),
    #[error("There is no creator function provided for the entity {0}.")]
    NoCreatorFunctionProvided(String),
    #[error("There is no mutator function provided for the entity {0}.")]
    NoMutatorFunctionProvided(String),
    #[error("There is no deleter function provided for the entity {0}.")]
    NoDeleterFunctionProvided(String),
    #[error("Invalid request path.")]
    InvalidRequestPath,
    #[error("Entity {entity} has no member or method member {name}.")]
    MemberOrMethodNotFound { entity: String, name: String },
    #[error("It's not allowed to variate member {member} of entity {entity}.")]
    TryingToVariateNotVariableMember { entity: String, member: String },
    #[error("Index must be a number. {0} is not a number.")]
    IndexIsNaN(String),
    #[error("Invalid method arguments.")]
    InvalidMethodArguments,
    #[error("Invalid creator arguments.")]
    InvalidCreatorArguments,
    #[error("Invalid mutator arguments.")]
    InvalidMutatorArguments,

    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn method_not_allowed() -> Self {
        ApiError::MethodNotAllowed("Method not allowed.".into())
    }

    pub fn member_or_method_not_found(entity: impl Into<String>, name: impl Into<String>) -> Self {
        ApiError::MemberOrMethodNotFound {
            entity: entity.into(),
            name: name.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::InvalidMethodArguments
            | ApiError::InvalidCreatorArguments
            | ApiError::InvalidMutatorArguments => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed(_)
            | ApiError::InvalidPutUsage
            | ApiError::TryingToVariateNotVariableMember { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound(_)
            | ApiError::InvalidEntityId { .. }
            | ApiError::EntitiesPrefixMissing(_)
            | ApiError::InvalidEntityName(_)
            | ApiError::NoCreatorFunctionProvided(_)
            | ApiError::NoMutatorFunctionProvided(_)
            | ApiError::NoDeleterFunctionProvided(_)
            | ApiError::InvalidRequestPath
            | ApiError::MemberOrMethodNotFound { .. }
            | ApiError::IndexIsNaN(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
