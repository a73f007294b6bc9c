use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::PgPool;
use uuid::Uuid;

const LEVEL_COLUMNS: &str = r#"
    id, key, name, scope, direct_rate, online_rate,
    is_premium, is_default, active, sort_order, created_at, updated_at
"#;

fn rate_for(level: &CommissionLevel, channel: Option<BookingChannel>) -> f64 {
    match channel {
        Some(BookingChannel::Online) => level.online_rate,
        _ => level.direct_rate,
    }
}

#[derive(Clone)]
pub struct CommissionService {
    pool: PgPool,
    default_rate: f64,
}

impl CommissionService {
    pub fn new(pool: PgPool, default_rate: f64) -> Self {
        Self { pool, default_rate }
    }

    /// Platform settings, created lazily. The insert targets the single-row
    /// primary key with ON CONFLICT DO NOTHING, so concurrent first access
    /// cannot produce a second row.
    pub async fn get_or_create_settings(&self) -> AppResult<CommissionSettings> {
        sqlx::query("INSERT INTO commission_settings (id) VALUES (TRUE) ON CONFLICT (id) DO NOTHING")
            .execute(&self.pool)
            .await?;

        let settings = sqlx::query_as::<_, CommissionSettings>(
            r#"
            SELECT base_rate, premium_rate, featured_rate, enforcement_paused, updated_at
            FROM commission_settings
            WHERE id = TRUE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(settings)
    }

    pub async fn list_levels(
        &self,
        scope: Option<CommissionScope>,
    ) -> AppResult<Vec<CommissionLevel>> {
        let levels = match scope {
            Some(scope) => {
                sqlx::query_as::<_, CommissionLevel>(&format!(
                    "SELECT {LEVEL_COLUMNS} FROM commission_levels WHERE scope = $1 ORDER BY sort_order, id"
                ))
                .bind(scope)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CommissionLevel>(&format!(
                    "SELECT {LEVEL_COLUMNS} FROM commission_levels ORDER BY sort_order, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(levels)
    }

    pub async fn get_level(&self, level_id: i64) -> AppResult<Option<CommissionLevel>> {
        let level = sqlx::query_as::<_, CommissionLevel>(&format!(
            "SELECT {LEVEL_COLUMNS} FROM commission_levels WHERE id = $1"
        ))
        .bind(level_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    pub async fn get_assignment(
        &self,
        item_type: CommissionScope,
        item_id: i64,
    ) -> AppResult<Option<CommissionAssignment>> {
        let assignment = sqlx::query_as::<_, CommissionAssignment>(
            r#"
            SELECT item_type, item_id, item_name, commission_level_id, updated_at
            FROM commission_assignments
            WHERE item_type = $1 AND item_id = $2
            "#,
        )
        .bind(item_type)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// Commission rate and amount for a booking. Invoked by the booking
    /// collaborators at creation time.
    pub async fn resolve_commission(
        &self,
        request: &ResolveCommissionRequest,
    ) -> AppResult<ResolveCommissionResponse> {
        if request.price < 0 {
            return Err(AppError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }

        let level = match request.item_id {
            Some(item_id) => {
                let assignment = self.get_assignment(request.item_type, item_id).await?;
                match assignment.and_then(|a| a.commission_level_id) {
                    Some(level_id) => self.get_level(level_id).await?,
                    None => None,
                }
            }
            None => None,
        };

        let settings = self.get_or_create_settings().await?;
        let rate = resolve_rate(
            level.as_ref(),
            request.item_type,
            request.channel,
            &settings,
            self.default_rate,
        );

        Ok(ResolveCommissionResponse {
            rate,
            commission_amount: commission_amount(request.price, rate),
        })
    }

    /// Change an item's commission level. The assignment write is the primary
    /// operation; the audit record is best-effort and its failure never rolls
    /// the change back.
    pub async fn upgrade_commission_level(
        &self,
        request: UpgradeCommissionRequest,
    ) -> AppResult<UpgradeCommissionResponse> {
        let new_level = self
            .get_level(request.commission_level_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Commission level {} not found",
                    request.commission_level_id
                ))
            })?;

        if !new_level.active {
            return Err(AppError::ValidationError(format!(
                "Commission level '{}' is inactive",
                new_level.name
            )));
        }
        if new_level.scope != request.item_type {
            return Err(AppError::ValidationError(format!(
                "Commission level '{}' is scoped to {}, not {}",
                new_level.name, new_level.scope, request.item_type
            )));
        }

        // Snapshot the previous assignment before overwriting it.
        let old_assignment = self.get_assignment(request.item_type, request.item_id).await?;
        let old_level = match old_assignment.as_ref().and_then(|a| a.commission_level_id) {
            Some(level_id) => self.get_level(level_id).await?,
            None => None,
        };

        let assignment = sqlx::query_as::<_, CommissionAssignment>(
            r#"
            INSERT INTO commission_assignments (item_type, item_id, item_name, commission_level_id, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (item_type, item_id) DO UPDATE
            SET commission_level_id = EXCLUDED.commission_level_id,
                item_name = COALESCE(EXCLUDED.item_name, commission_assignments.item_name),
                updated_at = NOW()
            RETURNING item_type, item_id, item_name, commission_level_id, updated_at
            "#,
        )
        .bind(request.item_type)
        .bind(request.item_id)
        .bind(&request.item_name)
        .bind(request.commission_level_id)
        .fetch_one(&self.pool)
        .await?;

        log::info!(
            "Commission level for {} {} changed to '{}' by actor {}",
            request.item_type,
            request.item_id,
            new_level.name,
            request.actor_id
        );

        let old_rate = old_level.as_ref().map(|l| rate_for(l, request.channel));
        let new_rate = rate_for(&new_level, request.channel);
        let old_commission_amount = match (request.booking_price, old_rate) {
            (Some(price), Some(rate)) => Some(commission_amount(price, rate)),
            _ => None,
        };
        let new_commission_amount = request
            .booking_price
            .map(|price| commission_amount(price, new_rate));

        let audit_logged = match self
            .insert_upgrade_log(
                &request,
                &assignment,
                old_level.as_ref(),
                &new_level,
                old_rate,
                new_rate,
                old_commission_amount,
                new_commission_amount,
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "Failed to write commission upgrade audit record for {} {}: {e}",
                    request.item_type,
                    request.item_id
                );
                false
            }
        };

        Ok(UpgradeCommissionResponse {
            assignment,
            audit_logged,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_upgrade_log(
        &self,
        request: &UpgradeCommissionRequest,
        assignment: &CommissionAssignment,
        old_level: Option<&CommissionLevel>,
        new_level: &CommissionLevel,
        old_rate: Option<f64>,
        new_rate: f64,
        old_commission_amount: Option<i64>,
        new_commission_amount: Option<i64>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO commission_upgrade_logs (
                id, actor_id, actor_role, item_type, item_id, item_name,
                old_level_id, old_level_name, old_rate, old_commission_amount,
                new_level_id, new_level_name, new_rate, new_commission_amount,
                booking_price, channel, description
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.actor_id)
        .bind(&request.actor_role)
        .bind(request.item_type)
        .bind(request.item_id)
        .bind(&assignment.item_name)
        .bind(old_level.map(|l| l.id))
        .bind(old_level.map(|l| l.name.clone()))
        .bind(old_rate)
        .bind(old_commission_amount)
        .bind(new_level.id)
        .bind(&new_level.name)
        .bind(new_rate)
        .bind(new_commission_amount)
        .bind(request.booking_price)
        .bind(request.channel)
        .bind(&request.description)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
