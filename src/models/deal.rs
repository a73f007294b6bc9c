use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "deal_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealType {
    EarlyBird,
    LastMinute,
    MobileOnly,
    FreeCancellation,
    LongStay,
    WeekendSpecial,
    WeekdaySpecial,
    Seasonal,
    FlashSale,
    PackageDeal,
}

impl std::fmt::Display for DealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DealType::EarlyBird => write!(f, "early_bird"),
            DealType::LastMinute => write!(f, "last_minute"),
            DealType::MobileOnly => write!(f, "mobile_only"),
            DealType::FreeCancellation => write!(f, "free_cancellation"),
            DealType::LongStay => write!(f, "long_stay"),
            DealType::WeekendSpecial => write!(f, "weekend_special"),
            DealType::WeekdaySpecial => write!(f, "weekday_special"),
            DealType::Seasonal => write!(f, "seasonal"),
            DealType::FlashSale => write!(f, "flash_sale"),
            DealType::PackageDeal => write!(f, "package_deal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "discount_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
    FreeNight,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::FixedAmount => write!(f, "fixed_amount"),
            DiscountType::FreeNight => write!(f, "free_night"),
        }
    }
}

/// Sparse eligibility constraints. Every field is optional; an absent field
/// places no restriction on the booking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DealConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_advance_booking_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_advance_booking_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_nights: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nights: Option<i64>,
    /// Lowercase English weekday names the check-in must fall on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicable_days: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_guests: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_guests: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rooms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_prepayment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_refundable: Option<bool>,
}

/// The booking under evaluation. All timestamps are UTC; `booking_date` is
/// the moment the quote is requested, captured once per request.
#[derive(Debug, Clone)]
pub struct BookingContext {
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    pub guests: i64,
    pub rooms: i64,
    pub is_mobile: bool,
    pub booking_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Deal {
    pub id: i64,
    pub property_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub deal_type: DealType,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    /// Cap for percentage discounts, in minor currency units.
    pub max_discount_amount: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub booking_start_date: Option<DateTime<Utc>>,
    pub booking_end_date: Option<DateTime<Utc>>,
    pub stay_start_date: Option<DateTime<Utc>>,
    pub stay_end_date: Option<DateTime<Utc>>,
    #[sqlx(json)]
    pub conditions: DealConditions,
    /// NULL means unlimited capacity.
    pub total_available_units: Option<i64>,
    pub units_booked: i64,
    pub priority: i64,
    pub is_active: bool,
    pub is_published: bool,
    pub views: i64,
    pub clicks: i64,
    pub bookings: i64,
    pub revenue: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ceiling of a duration expressed in whole days. Negative durations round
/// toward zero and below, matching ceil on the fractional day count.
fn ceil_days(duration: Duration) -> i64 {
    (duration.num_seconds() as f64 / 86_400.0).ceil() as i64
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

impl Deal {
    /// Derived availability: lifecycle flags, remaining units and the
    /// validity window, evaluated against a single `now`.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active || !self.is_published {
            return false;
        }
        if let Some(total) = self.total_available_units
            && self.units_booked >= total
        {
            return false;
        }
        now >= self.valid_from && now <= self.valid_until
    }

    /// Whether this deal applies to the given booking. Checks are
    /// conjunctive and short-circuit on the first failure.
    ///
    /// Day-of-week and day-count arithmetic use the UTC calendar throughout,
    /// so a check-in near midnight classifies consistently regardless of the
    /// caller's locale.
    pub fn is_applicable(&self, ctx: &BookingContext, now: DateTime<Utc>) -> bool {
        if !self.is_available(now) {
            return false;
        }

        // Stay window restricts the check-in date.
        if let Some(start) = self.stay_start_date
            && ctx.check_in_date < start
        {
            return false;
        }
        if let Some(end) = self.stay_end_date
            && ctx.check_in_date > end
        {
            return false;
        }

        // Booking window restricts when the reservation is made.
        if let Some(start) = self.booking_start_date
            && ctx.booking_date < start
        {
            return false;
        }
        if let Some(end) = self.booking_end_date
            && ctx.booking_date > end
        {
            return false;
        }

        let nights = ceil_days(ctx.check_out_date - ctx.check_in_date);
        let days_until_check_in = ceil_days(ctx.check_in_date - ctx.booking_date);

        if self.deal_type == DealType::EarlyBird
            && let Some(min_advance) = self.conditions.min_advance_booking_days
            && days_until_check_in < min_advance
        {
            return false;
        }

        if self.deal_type == DealType::LastMinute
            && let Some(max_advance) = self.conditions.max_advance_booking_days
            && days_until_check_in > max_advance
        {
            return false;
        }

        if let Some(min_nights) = self.conditions.min_nights
            && nights < min_nights
        {
            return false;
        }
        if let Some(max_nights) = self.conditions.max_nights
            && nights > max_nights
        {
            return false;
        }

        if self.conditions.mobile_only == Some(true) && !ctx.is_mobile {
            return false;
        }

        if let Some(min_guests) = self.conditions.min_guests
            && ctx.guests < min_guests
        {
            return false;
        }
        if let Some(max_guests) = self.conditions.max_guests
            && ctx.guests > max_guests
        {
            return false;
        }
        if let Some(min_rooms) = self.conditions.min_rooms
            && ctx.rooms < min_rooms
        {
            return false;
        }

        if let Some(days) = &self.conditions.applicable_days
            && !days.is_empty()
        {
            let day = weekday_name(ctx.check_in_date.date_naive().weekday());
            if !days.iter().any(|d| d == day) {
                return false;
            }
        }

        true
    }

    /// Discount in minor currency units, always within `[0, original_price]`.
    pub fn calculate_discount(&self, original_price: i64, nights: i64) -> i64 {
        let amount = match self.discount_type {
            DiscountType::Percentage => {
                let mut amount =
                    (original_price as f64 * self.discount_value / 100.0).round() as i64;
                if let Some(cap) = self.max_discount_amount {
                    amount = amount.min(cap);
                }
                amount
            }
            DiscountType::FixedAmount => self.discount_value.round() as i64,
            DiscountType::FreeNight => {
                // nights <= 0 means no discount, not a division fault.
                if nights <= 0 {
                    0
                } else {
                    let price_per_night = original_price as f64 / nights as f64;
                    let free_nights = (self.discount_value as i64).clamp(0, nights);
                    (price_per_night * free_nights as f64).round() as i64
                }
            }
        };

        amount.max(0).min(original_price.max(0))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DealResponse {
    pub id: i64,
    pub property_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub deal_type: DealType,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub max_discount_amount: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub booking_start_date: Option<DateTime<Utc>>,
    pub booking_end_date: Option<DateTime<Utc>>,
    pub stay_start_date: Option<DateTime<Utc>>,
    pub stay_end_date: Option<DateTime<Utc>>,
    pub conditions: DealConditions,
    pub total_available_units: Option<i64>,
    pub units_booked: i64,
    pub priority: i64,
    pub is_active: bool,
    pub is_published: bool,
    pub is_available: bool,
    pub views: i64,
    pub clicks: i64,
    pub bookings: i64,
    pub revenue: i64,
    pub created_at: DateTime<Utc>,
}

impl DealResponse {
    pub fn from_deal(deal: Deal, now: DateTime<Utc>) -> Self {
        let is_available = deal.is_available(now);
        Self {
            id: deal.id,
            property_id: deal.property_id,
            title: deal.title,
            description: deal.description,
            deal_type: deal.deal_type,
            discount_type: deal.discount_type,
            discount_value: deal.discount_value,
            max_discount_amount: deal.max_discount_amount,
            valid_from: deal.valid_from,
            valid_until: deal.valid_until,
            booking_start_date: deal.booking_start_date,
            booking_end_date: deal.booking_end_date,
            stay_start_date: deal.stay_start_date,
            stay_end_date: deal.stay_end_date,
            conditions: deal.conditions,
            total_available_units: deal.total_available_units,
            units_booked: deal.units_booked,
            priority: deal.priority,
            is_active: deal.is_active,
            is_published: deal.is_published,
            is_available,
            views: deal.views,
            clicks: deal.clicks,
            bookings: deal.bookings,
            revenue: deal.revenue,
            created_at: deal.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DealQuery {
    pub property_id: i64,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_one() -> i64 {
    1
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateDealRequest {
    pub property_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub deal_type: DealType,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub max_discount_amount: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub booking_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub booking_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stay_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stay_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conditions: DealConditions,
    #[serde(default)]
    pub total_available_units: Option<i64>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckApplicableRequest {
    pub property_id: i64,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    #[serde(default = "default_one")]
    pub guests: i64,
    #[serde(default = "default_one")]
    pub rooms: i64,
    #[serde(default)]
    pub is_mobile: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalculateDiscountRequest {
    pub deal_id: i64,
    /// Total stay price in minor currency units.
    pub original_price: i64,
    #[serde(default)]
    pub nights: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalculateDiscountResponse {
    pub discount: i64,
    pub final_price: i64,
    /// Share of the original price discounted, rounded to 2 decimals.
    pub discount_percent: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReserveUnitResponse {
    pub deal_id: i64,
    pub units_booked: i64,
    pub total_available_units: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn base_deal() -> Deal {
        Deal {
            id: 1,
            property_id: 10,
            title: "Test deal".to_string(),
            description: None,
            deal_type: DealType::Seasonal,
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            max_discount_amount: None,
            valid_from: ts(2025, 1, 1),
            valid_until: ts(2025, 12, 31),
            booking_start_date: None,
            booking_end_date: None,
            stay_start_date: None,
            stay_end_date: None,
            conditions: DealConditions::default(),
            total_available_units: None,
            units_booked: 0,
            priority: 0,
            is_active: true,
            is_published: true,
            views: 0,
            clicks: 0,
            bookings: 0,
            revenue: 0,
            created_at: ts(2025, 1, 1),
            updated_at: ts(2025, 1, 1),
        }
    }

    fn ctx(check_in: DateTime<Utc>, check_out: DateTime<Utc>, booking: DateTime<Utc>) -> BookingContext {
        BookingContext {
            check_in_date: check_in,
            check_out_date: check_out,
            guests: 2,
            rooms: 1,
            is_mobile: false,
            booking_date: booking,
        }
    }

    #[test]
    fn early_bird_advance_window() {
        let mut deal = base_deal();
        deal.deal_type = DealType::EarlyBird;
        deal.conditions.min_advance_booking_days = Some(30);

        let now = ts(2025, 3, 1);
        // 35 days out qualifies.
        let c = ctx(ts(2025, 4, 5), ts(2025, 4, 8), now);
        assert!(deal.is_applicable(&c, now));

        // 10 days out does not.
        let c = ctx(ts(2025, 3, 11), ts(2025, 3, 14), now);
        assert!(!deal.is_applicable(&c, now));
    }

    #[test]
    fn last_minute_advance_window() {
        let mut deal = base_deal();
        deal.deal_type = DealType::LastMinute;
        deal.conditions.max_advance_booking_days = Some(3);

        let now = ts(2025, 6, 1);
        let c = ctx(ts(2025, 6, 3), ts(2025, 6, 5), now);
        assert!(deal.is_applicable(&c, now));

        let c = ctx(ts(2025, 6, 20), ts(2025, 6, 22), now);
        assert!(!deal.is_applicable(&c, now));
    }

    #[test]
    fn advance_conditions_ignored_for_other_deal_types() {
        // min_advance_booking_days only binds early_bird deals.
        let mut deal = base_deal();
        deal.conditions.min_advance_booking_days = Some(30);

        let now = ts(2025, 6, 1);
        let c = ctx(ts(2025, 6, 3), ts(2025, 6, 5), now);
        assert!(deal.is_applicable(&c, now));
    }

    #[test]
    fn night_bounds() {
        let mut deal = base_deal();
        deal.conditions.min_nights = Some(3);
        deal.conditions.max_nights = Some(7);

        let now = ts(2025, 6, 1);
        assert!(deal.is_applicable(&ctx(ts(2025, 6, 10), ts(2025, 6, 14), now), now));
        assert!(!deal.is_applicable(&ctx(ts(2025, 6, 10), ts(2025, 6, 11), now), now));
        assert!(!deal.is_applicable(&ctx(ts(2025, 6, 10), ts(2025, 6, 20), now), now));
    }

    #[test]
    fn mobile_only_requires_mobile() {
        let mut deal = base_deal();
        deal.conditions.mobile_only = Some(true);

        let now = ts(2025, 6, 1);
        let mut c = ctx(ts(2025, 6, 10), ts(2025, 6, 12), now);
        assert!(!deal.is_applicable(&c, now));
        c.is_mobile = true;
        assert!(deal.is_applicable(&c, now));
    }

    #[test]
    fn guest_and_room_bounds() {
        let mut deal = base_deal();
        deal.conditions.min_guests = Some(2);
        deal.conditions.max_guests = Some(4);
        deal.conditions.min_rooms = Some(2);

        let now = ts(2025, 6, 1);
        let mut c = ctx(ts(2025, 6, 10), ts(2025, 6, 12), now);
        c.guests = 3;
        c.rooms = 2;
        assert!(deal.is_applicable(&c, now));

        c.guests = 1;
        assert!(!deal.is_applicable(&c, now));
        c.guests = 5;
        assert!(!deal.is_applicable(&c, now));
        c.guests = 3;
        c.rooms = 1;
        assert!(!deal.is_applicable(&c, now));
    }

    #[test]
    fn applicable_days_match_utc_weekday() {
        let mut deal = base_deal();
        deal.conditions.applicable_days =
            Some(vec!["saturday".to_string(), "sunday".to_string()]);

        let now = ts(2025, 6, 1);
        // 2025-06-07 is a Saturday.
        assert!(deal.is_applicable(&ctx(ts(2025, 6, 7), ts(2025, 6, 9), now), now));
        // 2025-06-10 is a Tuesday.
        assert!(!deal.is_applicable(&ctx(ts(2025, 6, 10), ts(2025, 6, 12), now), now));
    }

    #[test]
    fn stay_and_booking_windows() {
        let mut deal = base_deal();
        deal.stay_start_date = Some(ts(2025, 7, 1));
        deal.stay_end_date = Some(ts(2025, 7, 31));
        deal.booking_start_date = Some(ts(2025, 6, 1));
        deal.booking_end_date = Some(ts(2025, 6, 30));

        let now = ts(2025, 6, 15);
        assert!(deal.is_applicable(&ctx(ts(2025, 7, 10), ts(2025, 7, 12), now), now));
        // Check-in outside the stay window.
        assert!(!deal.is_applicable(&ctx(ts(2025, 8, 10), ts(2025, 8, 12), now), now));

        // Booking made outside the booking window.
        let late = ts(2025, 7, 5);
        assert!(!deal.is_applicable(&ctx(ts(2025, 7, 10), ts(2025, 7, 12), late), late));
    }

    #[test]
    fn unavailable_when_units_exhausted() {
        let mut deal = base_deal();
        deal.total_available_units = Some(5);
        deal.units_booked = 5;

        let now = ts(2025, 6, 1);
        assert!(!deal.is_available(now));
        assert!(!deal.is_applicable(&ctx(ts(2025, 6, 10), ts(2025, 6, 12), now), now));

        deal.units_booked = 4;
        assert!(deal.is_available(now));
    }

    #[test]
    fn unavailable_outside_validity_window() {
        let deal = base_deal();
        assert!(!deal.is_available(ts(2024, 12, 31)));
        assert!(!deal.is_available(ts(2026, 1, 1)));
        assert!(deal.is_available(ts(2025, 6, 1)));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut deal = base_deal();
        deal.deal_type = DealType::EarlyBird;
        deal.conditions.min_advance_booking_days = Some(10);

        let now = ts(2025, 6, 1);
        let c = ctx(ts(2025, 6, 20), ts(2025, 6, 23), now);
        let first = deal.is_applicable(&c, now);
        let second = deal.is_applicable(&c, now);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn percentage_discount_with_cap() {
        let mut deal = base_deal();
        deal.discount_type = DiscountType::Percentage;
        deal.discount_value = 25.0;
        deal.max_discount_amount = Some(20_000);

        // 25% of 100000 is 25000, capped to 20000.
        assert_eq!(deal.calculate_discount(100_000, 1), 20_000);

        deal.max_discount_amount = None;
        assert_eq!(deal.calculate_discount(100_000, 1), 25_000);
    }

    #[test]
    fn fixed_amount_clamped_to_price() {
        let mut deal = base_deal();
        deal.discount_type = DiscountType::FixedAmount;
        deal.discount_value = 50_000.0;

        assert_eq!(deal.calculate_discount(80_000, 1), 50_000);
        // A fixed discount larger than the price clamps to the price.
        assert_eq!(deal.calculate_discount(30_000, 1), 30_000);
    }

    #[test]
    fn free_night_discount() {
        let mut deal = base_deal();
        deal.discount_type = DiscountType::FreeNight;
        deal.discount_value = 2.0;

        // 300000 over 3 nights: 100000/night, 2 nights free.
        assert_eq!(deal.calculate_discount(300_000, 3), 200_000);
        // More free nights than the stay clamps to the stay length.
        assert_eq!(deal.calculate_discount(300_000, 1), 300_000);
        // Degenerate night counts yield no discount.
        assert_eq!(deal.calculate_discount(300_000, 0), 0);
        assert_eq!(deal.calculate_discount(300_000, -2), 0);
    }

    #[test]
    fn discount_never_exceeds_price() {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        for _ in 0..2_000 {
            let mut deal = base_deal();
            deal.discount_type = match rng.gen_range(0..3) {
                0 => DiscountType::Percentage,
                1 => DiscountType::FixedAmount,
                _ => DiscountType::FreeNight,
            };
            deal.discount_value = match deal.discount_type {
                DiscountType::Percentage => rng.gen_range(0.0..=100.0),
                DiscountType::FixedAmount => rng.gen_range(0.0..2_000_000.0),
                DiscountType::FreeNight => rng.gen_range(0.0..10.0),
            };
            deal.max_discount_amount = if rng.gen_bool(0.5) {
                Some(rng.gen_range(0..500_000))
            } else {
                None
            };

            let price = rng.gen_range(1..2_000_000);
            let nights = rng.gen_range(-2..14);
            let discount = deal.calculate_discount(price, nights);

            assert!(discount >= 0, "negative discount: {discount}");
            assert!(
                discount <= price,
                "discount {discount} exceeds price {price} ({:?})",
                deal.discount_type
            );
        }
    }
}
