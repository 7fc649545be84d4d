use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::users;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct InsertSubscriptionEntity {
    pub chat_id: i64,
    pub user_id: i64,
    pub is_active: bool,
    pub expired_date: DateTime<Utc>,
}
