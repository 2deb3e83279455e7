//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time by utoipa and served at
//! `/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the corpus-fetch REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "corpus-fetch REST API",
        version = "0.1.0",
        description = "Counts lines matching a regular expression across every document under a prefix of an object store container",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::api::routes::search,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::api::routes::SearchResponse,
        crate::api::routes::HealthResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "search", description = "Search - Count matching lines across the corpus"),
        (name = "system", description = "System endpoints - Health checks and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
