use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{PaginatedResponse, PaginationParams};
use chrono::Utc;
use sqlx::PgPool;

const DEAL_COLUMNS: &str = r#"
    id, property_id, title, description, deal_type, discount_type,
    discount_value, max_discount_amount, valid_from, valid_until,
    booking_start_date, booking_end_date, stay_start_date, stay_end_date,
    conditions, total_available_units, units_booked, priority,
    is_active, is_published, views, clicks, bookings, revenue,
    created_at, updated_at
"#;

// Availability at query level: lifecycle flags, validity window, remaining
// units. $2 is the single per-request timestamp.
const AVAILABLE_WHERE: &str = r#"
    property_id = $1
    AND is_active AND is_published
    AND valid_from <= $2 AND valid_until >= $2
    AND (total_available_units IS NULL OR units_booked < total_available_units)
"#;

#[derive(Clone)]
pub struct DealService {
    pool: PgPool,
}

impl DealService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Currently available deals for a property, for display. No eligibility
    /// filtering here, only raw availability.
    pub async fn list_deals(
        &self,
        query: &DealQuery,
    ) -> AppResult<PaginatedResponse<DealResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let offset = params.get_offset() as i64;
        let limit = params.get_limit() as i64;
        let now = Utc::now();

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM deals WHERE {AVAILABLE_WHERE}"
        ))
        .bind(query.property_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let deals = sqlx::query_as::<_, Deal>(&format!(
            r#"
            SELECT {DEAL_COLUMNS}
            FROM deals
            WHERE {AVAILABLE_WHERE}
            ORDER BY priority DESC, created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(query.property_id)
        .bind(now)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<DealResponse> = deals
            .into_iter()
            .map(|d| DealResponse::from_deal(d, now))
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// Create a deal. Invariant violations are rejected here, never clamped.
    pub async fn create_deal(&self, request: CreateDealRequest) -> AppResult<DealResponse> {
        if request.valid_from >= request.valid_until {
            return Err(AppError::ValidationError(
                "valid_from must be before valid_until".to_string(),
            ));
        }
        if request.discount_value < 0.0 {
            return Err(AppError::ValidationError(
                "discount_value must not be negative".to_string(),
            ));
        }
        if request.discount_type == DiscountType::Percentage && request.discount_value > 100.0 {
            return Err(AppError::ValidationError(
                "percentage discount_value must not exceed 100".to_string(),
            ));
        }
        if let Some(cap) = request.max_discount_amount
            && cap < 0
        {
            return Err(AppError::ValidationError(
                "max_discount_amount must not be negative".to_string(),
            ));
        }
        if let Some(units) = request.total_available_units
            && units <= 0
        {
            return Err(AppError::ValidationError(
                "total_available_units must be positive".to_string(),
            ));
        }

        let deal = sqlx::query_as::<_, Deal>(&format!(
            r#"
            INSERT INTO deals (
                property_id, title, description, deal_type, discount_type,
                discount_value, max_discount_amount, valid_from, valid_until,
                booking_start_date, booking_end_date, stay_start_date,
                stay_end_date, conditions, total_available_units, priority,
                is_active, is_published
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9,
                $10, $11, $12, $13, $14, $15, $16, $17, $18
            )
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(request.property_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.deal_type)
        .bind(request.discount_type)
        .bind(request.discount_value)
        .bind(request.max_discount_amount)
        .bind(request.valid_from)
        .bind(request.valid_until)
        .bind(request.booking_start_date)
        .bind(request.booking_end_date)
        .bind(request.stay_start_date)
        .bind(request.stay_end_date)
        .bind(sqlx::types::Json(&request.conditions))
        .bind(request.total_available_units)
        .bind(request.priority)
        .bind(request.is_active)
        .bind(request.is_published)
        .fetch_one(&self.pool)
        .await?;

        log::info!(
            "Created deal {} ({}) for property {}",
            deal.id,
            deal.deal_type,
            deal.property_id
        );

        let now = Utc::now();
        Ok(DealResponse::from_deal(deal, now))
    }

    /// Deals applicable to a concrete booking, ordered by priority descending
    /// with ties broken by most recent creation. The eligibility filter keeps
    /// the query ordering; no re-ranking by discount size.
    pub async fn find_applicable_deals(
        &self,
        request: &CheckApplicableRequest,
    ) -> AppResult<Vec<DealResponse>> {
        if request.check_out_date <= request.check_in_date {
            return Err(AppError::ValidationError(
                "check_out_date must be after check_in_date".to_string(),
            ));
        }

        // One timestamp for the whole evaluation.
        let now = Utc::now();
        let ctx = BookingContext {
            check_in_date: request.check_in_date,
            check_out_date: request.check_out_date,
            guests: request.guests,
            rooms: request.rooms,
            is_mobile: request.is_mobile,
            booking_date: now,
        };

        let candidates = sqlx::query_as::<_, Deal>(&format!(
            r#"
            SELECT {DEAL_COLUMNS}
            FROM deals
            WHERE {AVAILABLE_WHERE}
            ORDER BY priority DESC, created_at DESC
            "#
        ))
        .bind(request.property_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let applicable: Vec<DealResponse> = candidates
            .into_iter()
            .filter(|deal| deal.is_applicable(&ctx, now))
            .map(|deal| DealResponse::from_deal(deal, now))
            .collect();

        Ok(applicable)
    }

    pub async fn calculate_discount(
        &self,
        request: &CalculateDiscountRequest,
    ) -> AppResult<CalculateDiscountResponse> {
        if request.original_price <= 0 {
            return Err(AppError::ValidationError(
                "original_price must be positive".to_string(),
            ));
        }
        let nights = request.nights.unwrap_or(1);

        let deal = self
            .get_deal(request.deal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Deal {} not found", request.deal_id)))?;

        let discount = deal.calculate_discount(request.original_price, nights);
        let final_price = request.original_price - discount;
        let discount_percent =
            (discount as f64 / request.original_price as f64 * 100.0 * 100.0).round() / 100.0;

        Ok(CalculateDiscountResponse {
            discount,
            final_price,
            discount_percent,
        })
    }

    /// Reserve one unit of a deal's capacity. The availability check and the
    /// increment are a single conditional UPDATE, so two concurrent attempts
    /// at the last unit cannot both succeed.
    pub async fn reserve_unit(&self, deal_id: i64) -> AppResult<ReserveUnitResponse> {
        let now = Utc::now();

        let updated = sqlx::query_as::<_, (i64, Option<i64>)>(
            r#"
            UPDATE deals
            SET units_booked = units_booked + 1, updated_at = NOW()
            WHERE id = $1
              AND is_active AND is_published
              AND valid_from <= $2 AND valid_until >= $2
              AND (total_available_units IS NULL OR units_booked < total_available_units)
            RETURNING units_booked, total_available_units
            "#,
        )
        .bind(deal_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some((units_booked, total_available_units)) => Ok(ReserveUnitResponse {
                deal_id,
                units_booked,
                total_available_units,
            }),
            None => {
                // Distinguish a missing deal from one that is sold out or
                // otherwise unavailable.
                if self.get_deal(deal_id).await?.is_none() {
                    Err(AppError::NotFound(format!("Deal {deal_id} not found")))
                } else {
                    Err(AppError::ValidationError(format!(
                        "Deal {deal_id} is not available or has no units left"
                    )))
                }
            }
        }
    }

    async fn get_deal(&self, deal_id: i64) -> AppResult<Option<Deal>> {
        let deal = sqlx::query_as::<_, Deal>(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals WHERE id = $1"
        ))
        .bind(deal_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deal)
    }
}
