//! Base address stage.
//!
//! Stores the configured server base address in every request so that the
//! response header composer can resolve resource keys into absolute URIs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::context::BaseAddress;

/// Middleware inserting the [`BaseAddress`] into the request extensions.
pub async fn resolve_base(
    State(base): State<BaseAddress>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(base);
    next.run(request).await
}
