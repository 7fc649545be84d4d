use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::chat;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = chat)]
#[diesel(primary_key(chat_id))]
pub struct ChatEntity {
    pub chat_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = chat)]
pub struct InsertChatEntity {
    pub chat_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub is_active: bool,
}
