use crate::models::*;
use crate::services::DealService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/deals",
    tag = "deal",
    params(
        ("property_id" = i64, Query, description = "Owning property id"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Available deals for the property"),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn list_deals(
    deal_service: web::Data<DealService>,
    query: web::Query<DealQuery>,
) -> Result<HttpResponse> {
    match deal_service.list_deals(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/deals",
    tag = "deal",
    request_body = CreateDealRequest,
    responses(
        (status = 200, description = "Deal created", body = DealResponse),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_deal(
    deal_service: web::Data<DealService>,
    request: web::Json<CreateDealRequest>,
) -> Result<HttpResponse> {
    match deal_service.create_deal(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/deals/check-applicable",
    tag = "deal",
    request_body = CheckApplicableRequest,
    responses(
        (status = 200, description = "Applicable deals, highest priority first"),
        (status = 400, description = "Invalid booking context")
    )
)]
pub async fn check_applicable(
    deal_service: web::Data<DealService>,
    request: web::Json<CheckApplicableRequest>,
) -> Result<HttpResponse> {
    match deal_service.find_applicable_deals(&request).await {
        Ok(deals) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": deals
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/deals/calculate-discount",
    tag = "deal",
    request_body = CalculateDiscountRequest,
    responses(
        (status = 200, description = "Discount breakdown", body = CalculateDiscountResponse),
        (status = 400, description = "Invalid price or nights"),
        (status = 404, description = "Deal not found")
    )
)]
pub async fn calculate_discount(
    deal_service: web::Data<DealService>,
    request: web::Json<CalculateDiscountRequest>,
) -> Result<HttpResponse> {
    match deal_service.calculate_discount(&request).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/deals/{id}/reserve",
    tag = "deal",
    params(
        ("id" = i64, Path, description = "Deal id")
    ),
    responses(
        (status = 200, description = "Unit reserved", body = ReserveUnitResponse),
        (status = 400, description = "Deal unavailable or sold out"),
        (status = 404, description = "Deal not found")
    )
)]
pub async fn reserve_unit(
    deal_service: web::Data<DealService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match deal_service.reserve_unit(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn deal_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/deals")
            .route("", web::get().to(list_deals))
            .route("", web::post().to(create_deal))
            .route("/check-applicable", web::post().to(check_applicable))
            .route("/calculate-discount", web::post().to(calculate_discount))
            .route("/{id}/reserve", web::post().to(reserve_unit)),
    );
}
