use axum::Router;
use fauna::kernel::prelude::ApiState;
use fauna::kernel::server::ApiStateError;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(info(title = "Fauna", description = "Location-anchored spawn pool"))]
struct ApiDoc;

/// The complete application: system and slice routes plus the Scalar UI at `/api`.
///
/// # Errors
/// [`ApiStateError::MissingSlice`] when `state` lacks a feature slice.
pub fn app(state: ApiState) -> Result<Router, ApiStateError> {
    let api = ApiDoc::openapi();

    // Separate the OpenAPI routes and the API documentation object
    let (openapi_routes, api_doc) = OpenApiRouter::with_openapi(api)
        .merge(fauna::server::router(&state)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts();

    let scalar_routes = Scalar::with_url("/api", api_doc);

    Ok(Router::new().merge(openapi_routes).merge(scalar_routes))
}
