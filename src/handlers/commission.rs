use crate::models::*;
use crate::services::CommissionService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/commission/levels",
    tag = "commission",
    params(
        ("scope" = Option<CommissionScope>, Query, description = "Filter by domain: property/flight")
    ),
    responses(
        (status = 200, description = "Commission level catalog")
    )
)]
pub async fn list_levels(
    commission_service: web::Data<CommissionService>,
    query: web::Query<CommissionLevelQuery>,
) -> Result<HttpResponse> {
    match commission_service.list_levels(query.scope).await {
        Ok(levels) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": levels
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/commission/settings",
    tag = "commission",
    responses(
        (status = 200, description = "Platform-wide default rates", body = CommissionSettings)
    )
)]
pub async fn get_settings(
    commission_service: web::Data<CommissionService>,
) -> Result<HttpResponse> {
    match commission_service.get_or_create_settings().await {
        Ok(settings) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": settings
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/commission/resolve",
    tag = "commission",
    request_body = ResolveCommissionRequest,
    responses(
        (status = 200, description = "Resolved rate and amount", body = ResolveCommissionResponse),
        (status = 400, description = "Invalid price")
    )
)]
pub async fn resolve_commission(
    commission_service: web::Data<CommissionService>,
    request: web::Json<ResolveCommissionRequest>,
) -> Result<HttpResponse> {
    match commission_service.resolve_commission(&request).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/commission/upgrade",
    tag = "commission",
    request_body = UpgradeCommissionRequest,
    responses(
        (status = 200, description = "Assignment updated", body = UpgradeCommissionResponse),
        (status = 400, description = "Level inactive or scope mismatch"),
        (status = 404, description = "Commission level not found")
    )
)]
pub async fn upgrade_commission(
    commission_service: web::Data<CommissionService>,
    request: web::Json<UpgradeCommissionRequest>,
) -> Result<HttpResponse> {
    match commission_service
        .upgrade_commission_level(request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn commission_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/commission")
            .route("/levels", web::get().to(list_levels))
            .route("/settings", web::get().to(get_settings))
            .route("/resolve", web::post().to(resolve_commission))
            .route("/upgrade", web::post().to(upgrade_commission)),
    );
}
