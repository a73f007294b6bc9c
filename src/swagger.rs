use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::deal::list_deals,
        handlers::deal::create_deal,
        handlers::deal::check_applicable,
        handlers::deal::calculate_discount,
        handlers::deal::reserve_unit,
        handlers::commission::list_levels,
        handlers::commission::get_settings,
        handlers::commission::resolve_commission,
        handlers::commission::upgrade_commission,
    ),
    components(
        schemas(
            Deal,
            DealResponse,
            DealType,
            DiscountType,
            DealConditions,
            DealQuery,
            CreateDealRequest,
            CheckApplicableRequest,
            CalculateDiscountRequest,
            CalculateDiscountResponse,
            ReserveUnitResponse,
            CommissionLevel,
            CommissionSettings,
            CommissionAssignment,
            CommissionUpgradeLog,
            CommissionScope,
            BookingChannel,
            CommissionLevelQuery,
            ResolveCommissionRequest,
            ResolveCommissionResponse,
            UpgradeCommissionRequest,
            UpgradeCommissionResponse,
            ApiError,
        )
    ),
    tags(
        (name = "deal", description = "Deal eligibility and discount API"),
        (name = "commission", description = "Commission resolution API"),
    ),
    info(
        title = "StayHub Backend API",
        version = "1.0.0",
        description = "Deal eligibility and commission resolution REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
