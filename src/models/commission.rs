use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Domain a commission level (and the items it can be assigned to) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "commission_scope", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommissionScope {
    Property,
    Flight,
}

impl std::fmt::Display for CommissionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommissionScope::Property => write!(f, "property"),
            CommissionScope::Flight => write!(f, "flight"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingChannel {
    Online,
    Direct,
}

impl std::fmt::Display for BookingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingChannel::Online => write!(f, "online"),
            BookingChannel::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CommissionLevel {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub scope: CommissionScope,
    pub direct_rate: f64,
    pub online_rate: f64,
    pub is_premium: bool,
    pub is_default: bool,
    pub active: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Platform-wide default rates. A single row exists; see the
/// `commission_settings` migration for the uniqueness constraint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CommissionSettings {
    pub base_rate: Option<f64>,
    pub premium_rate: Option<f64>,
    pub featured_rate: Option<f64>,
    pub enforcement_paused: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CommissionAssignment {
    pub item_type: CommissionScope,
    pub item_id: i64,
    pub item_name: Option<String>,
    pub commission_level_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit record for manual commission-level changes.
/// Never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CommissionUpgradeLog {
    pub id: Uuid,
    pub actor_id: i64,
    pub actor_role: String,
    pub item_type: CommissionScope,
    pub item_id: i64,
    pub item_name: Option<String>,
    pub old_level_id: Option<i64>,
    pub old_level_name: Option<String>,
    pub old_rate: Option<f64>,
    pub old_commission_amount: Option<i64>,
    pub new_level_id: i64,
    pub new_level_name: String,
    pub new_rate: f64,
    pub new_commission_amount: Option<i64>,
    pub booking_price: Option<i64>,
    pub channel: Option<BookingChannel>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn usable(rate: f64) -> bool {
    rate > 0.0 && rate <= 100.0
}

/// Resolve the commission rate for a booking, in percent.
///
/// An active level whose scope matches wins: `online_rate` for the online
/// channel, `direct_rate` otherwise. When no level yields a usable rate the
/// platform settings are consulted, premium before base; `default_rate` is
/// the last resort. The result is always within `[0, 100]`.
pub fn resolve_rate(
    level: Option<&CommissionLevel>,
    scope: CommissionScope,
    channel: BookingChannel,
    settings: &CommissionSettings,
    default_rate: f64,
) -> f64 {
    if let Some(level) = level
        && level.active
        && level.scope == scope
    {
        let rate = match channel {
            BookingChannel::Online => level.online_rate,
            BookingChannel::Direct => level.direct_rate,
        };
        if usable(rate) {
            return rate;
        }
    }

    for fallback in [settings.premium_rate, settings.base_rate] {
        if let Some(rate) = fallback
            && usable(rate)
        {
            return rate;
        }
    }

    if usable(default_rate) { default_rate } else { 10.0 }
}

/// Commission owed on `price` at `rate` percent, rounded half-up to the
/// nearest whole minor currency unit. Never negative.
pub fn commission_amount(price: i64, rate: f64) -> i64 {
    (price.max(0) as f64 * rate / 100.0).round() as i64
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommissionLevelQuery {
    pub scope: Option<CommissionScope>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolveCommissionRequest {
    pub item_type: CommissionScope,
    /// When set, the item's current level assignment is looked up.
    #[serde(default)]
    pub item_id: Option<i64>,
    pub channel: BookingChannel,
    /// Booking price in minor currency units.
    pub price: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolveCommissionResponse {
    pub rate: f64,
    pub commission_amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpgradeCommissionRequest {
    pub actor_id: i64,
    pub actor_role: String,
    pub item_type: CommissionScope,
    pub item_id: i64,
    #[serde(default)]
    pub item_name: Option<String>,
    pub commission_level_id: i64,
    #[serde(default)]
    pub booking_price: Option<i64>,
    #[serde(default)]
    pub channel: Option<BookingChannel>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpgradeCommissionResponse {
    pub assignment: CommissionAssignment,
    /// Whether the audit record was written. The upgrade succeeds either way.
    pub audit_logged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn level(direct: f64, online: f64) -> CommissionLevel {
        CommissionLevel {
            id: 1,
            key: "premium".to_string(),
            name: "Premium".to_string(),
            scope: CommissionScope::Property,
            direct_rate: direct,
            online_rate: online,
            is_premium: true,
            is_default: false,
            active: true,
            sort_order: 1,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn settings(base: Option<f64>, premium: Option<f64>) -> CommissionSettings {
        CommissionSettings {
            base_rate: base,
            premium_rate: premium,
            featured_rate: Some(12.0),
            enforcement_paused: false,
            updated_at: now(),
        }
    }

    #[test]
    fn channel_selects_sub_rate() {
        let level = level(8.0, 12.0);
        let s = settings(Some(8.0), Some(10.0));

        let online = resolve_rate(
            Some(&level),
            CommissionScope::Property,
            BookingChannel::Online,
            &s,
            10.0,
        );
        assert_eq!(online, 12.0);
        assert_eq!(commission_amount(450_000, online), 54_000);

        let direct = resolve_rate(
            Some(&level),
            CommissionScope::Property,
            BookingChannel::Direct,
            &s,
            10.0,
        );
        assert_eq!(direct, 8.0);
    }

    #[test]
    fn premium_rate_wins_fallback_order() {
        let s = settings(Some(8.0), Some(10.0));
        let rate = resolve_rate(
            None,
            CommissionScope::Property,
            BookingChannel::Online,
            &s,
            10.0,
        );
        assert_eq!(rate, 10.0);
    }

    #[test]
    fn base_rate_used_when_premium_missing() {
        let s = settings(Some(8.0), None);
        let rate = resolve_rate(
            None,
            CommissionScope::Property,
            BookingChannel::Direct,
            &s,
            10.0,
        );
        assert_eq!(rate, 8.0);

        // Zero is not usable.
        let s = settings(Some(8.0), Some(0.0));
        let rate = resolve_rate(
            None,
            CommissionScope::Property,
            BookingChannel::Direct,
            &s,
            10.0,
        );
        assert_eq!(rate, 8.0);
    }

    #[test]
    fn default_rate_is_last_resort() {
        let s = settings(None, None);
        let rate = resolve_rate(
            None,
            CommissionScope::Property,
            BookingChannel::Online,
            &s,
            10.0,
        );
        assert_eq!(rate, 10.0);
    }

    #[test]
    fn inactive_level_falls_through() {
        let mut level = level(8.0, 12.0);
        level.active = false;
        let s = settings(Some(6.0), None);
        let rate = resolve_rate(
            Some(&level),
            CommissionScope::Property,
            BookingChannel::Online,
            &s,
            10.0,
        );
        assert_eq!(rate, 6.0);
    }

    #[test]
    fn scope_mismatch_falls_through() {
        let level = level(8.0, 12.0);
        let s = settings(Some(6.0), None);
        let rate = resolve_rate(
            Some(&level),
            CommissionScope::Flight,
            BookingChannel::Online,
            &s,
            10.0,
        );
        assert_eq!(rate, 6.0);
    }

    #[test]
    fn zero_level_rate_falls_through() {
        let level = level(0.0, 0.0);
        let s = settings(Some(7.5), None);
        let rate = resolve_rate(
            Some(&level),
            CommissionScope::Property,
            BookingChannel::Direct,
            &s,
            10.0,
        );
        assert_eq!(rate, 7.5);
    }

    #[test]
    fn resolved_rate_always_in_range() {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        for _ in 0..2_000 {
            let level = if rng.gen_bool(0.5) {
                let mut l = level(rng.gen_range(-50.0..200.0), rng.gen_range(-50.0..200.0));
                l.active = rng.gen_bool(0.7);
                Some(l)
            } else {
                None
            };
            let s = settings(
                if rng.gen_bool(0.5) {
                    Some(rng.gen_range(-50.0..200.0))
                } else {
                    None
                },
                if rng.gen_bool(0.5) {
                    Some(rng.gen_range(-50.0..200.0))
                } else {
                    None
                },
            );
            let channel = if rng.gen_bool(0.5) {
                BookingChannel::Online
            } else {
                BookingChannel::Direct
            };

            let rate = resolve_rate(level.as_ref(), CommissionScope::Property, channel, &s, 10.0);
            assert!((0.0..=100.0).contains(&rate), "rate out of range: {rate}");
        }
    }

    #[test]
    fn commission_amount_rounds_half_up() {
        assert_eq!(commission_amount(10, 25.0), 3); // 2.5 rounds up
        assert_eq!(commission_amount(450_000, 12.0), 54_000);
        assert_eq!(commission_amount(333, 2.5), 8); // 8.325 rounds down
        assert_eq!(commission_amount(-500, 10.0), 0);
    }
}
