use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::chats::InsertChatEntity,
    value_objects::{chats::ChatInfo, op_context::OpContext, storage_errors::StorageResult},
};

/// Storage capability behind the paywall service. Each call is one atomic unit of
/// work against the store.
#[async_trait]
#[automock]
pub trait PaywallRepository {
    async fn add_new_chat(
        &self,
        ctx: &OpContext,
        insert_chat_entity: InsertChatEntity,
    ) -> StorageResult<()>;

    async fn get_chats_by_owner(&self, ctx: &OpContext, owner_id: i64)
    -> StorageResult<Vec<ChatInfo>>;

    async fn disable_chat(&self, ctx: &OpContext, chat_id: i64) -> StorageResult<()>;

    async fn change_description(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        description: String,
    ) -> StorageResult<()>;

    async fn change_price(&self, ctx: &OpContext, chat_id: i64, price: i64) -> StorageResult<()>;

    async fn list_subscribers(&self, ctx: &OpContext, chat_id: i64) -> StorageResult<Vec<i64>>;

    async fn new_subscribe(&self, ctx: &OpContext, chat_id: i64, user_id: i64)
    -> StorageResult<()>;

    async fn list_subscriptions(&self, ctx: &OpContext, user_id: i64) -> StorageResult<Vec<i64>>;

    async fn pay(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> StorageResult<()>;

    async fn is_subscribed(&self, ctx: &OpContext, chat_id: i64, user_id: i64)
    -> StorageResult<bool>;

    async fn is_paid(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> StorageResult<bool>;

    /// Releases the underlying store. Later calls fail with `ConnectionFailure`.
    async fn close(&self) -> StorageResult<()>;
}
