//! OpenAPI specification builder using utoipa.

use utoipa::OpenApi;

use crate::rest::dto::{
    AddressDialogView, ChildView, FlowResponse, HealthResponse, OptionResponse, StatusResponse,
    StepView, VariantResponse,
};
use crate::rest::error::ErrorResponse;

/// OpenAPI documentation for the benefits wizard
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Benefits Flow API",
        description = "Multi-step apply and renew wizard. Step routes answer with JSON step views and 303 redirects.",
        license(name = "MIT")
    ),
    paths(
        // Health endpoints
        crate::rest::routes::health::health,
        crate::rest::routes::health::status,
        // Catalog endpoints
        crate::rest::routes::flows::list,
        crate::rest::routes::flows::get_variant,
        // Reference endpoints
        crate::rest::routes::reference::countries,
        crate::rest::routes::reference::provinces,
        crate::rest::routes::reference::federal_programs,
        crate::rest::routes::reference::provincial_programs,
        // Wizard endpoints
        crate::rest::routes::steps::start,
        crate::rest::routes::steps::show_flow_step,
        crate::rest::routes::steps::submit_flow_step,
        crate::rest::routes::steps::show_step,
        crate::rest::routes::steps::submit_step,
        // Child endpoints
        crate::rest::routes::children::add,
        crate::rest::routes::children::remove,
        crate::rest::routes::children::show_step,
        crate::rest::routes::children::submit_step,
    ),
    components(
        schemas(
            HealthResponse,
            StatusResponse,
            FlowResponse,
            VariantResponse,
            OptionResponse,
            StepView,
            ChildView,
            AddressDialogView,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check and status endpoints"),
        (name = "Flows", description = "Catalog of flow kinds and variants"),
        (name = "Reference", description = "Select lists for countries, provinces and programs"),
        (name = "Wizard", description = "Flow and variant steps"),
        (name = "Children", description = "Per-child sub-flow"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as a JSON string
    pub fn json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
