//! Error types for route registration.

use thiserror::Error;

/// Errors that make a route pattern unusable.
///
/// These are programming errors: [`Router::register`] and the per-method
/// helpers panic with them, [`Router::try_register`] returns them.
///
/// [`Router::register`]: crate::Router::register
/// [`Router::try_register`]: crate::Router::try_register
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The method name is not one of the nine standard verbs.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The pattern does not start with `/`.
    #[error("Route pattern must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    /// A `:` or `*` segment has no name.
    #[error("Route parameter without a name in {0:?}")]
    EmptyParamName(String),

    /// A `:` or `*` that does not start a segment, as in `/v1:batch`.
    #[error("Route parameter must start a segment in {0:?}")]
    MisplacedParam(String),

    /// Something follows a `*name` segment.
    #[error("Catch-all parameter must be the last segment in {0:?}")]
    WildcardNotLast(String),
}
