use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Length of one paid period.
pub const SUBSCRIPTION_PERIOD: Months = Months::new(1);

/// Expiry of a subscription requested at `anchor`.
///
/// The period is anchored at subscribe time, not at payment time, so a pending
/// subscription can lapse before it is ever paid. Month overflow clamps to the
/// last day of the next month (Jan 31 -> Feb 28/29).
pub fn expiry_from(anchor: DateTime<Utc>) -> DateTime<Utc> {
    anchor
        .checked_add_months(SUBSCRIPTION_PERIOD)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionModel {
    pub chat_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserModel {
    pub user_id: i64,
}
