//! In-memory storage engine backed by a `Mutex`-guarded state.
//!
//! Mirrors the PostgreSQL engine's observable behavior (conflicts, no-op updates,
//! insertion ordering, `close`) for tests and local runs without a database.

use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    entities::chats::InsertChatEntity,
    repositories::paywall::PaywallRepository,
    value_objects::{
        chats::ChatInfo,
        op_context::OpContext,
        storage_errors::{StorageError, StorageResult},
        subscriptions::expiry_from,
    },
};

#[derive(Debug, Clone)]
struct ChatRow {
    chat_id: i64,
    owner_id: i64,
    name: String,
    description: String,
    price: i64,
    is_active: bool,
}

#[derive(Debug, Clone)]
struct SubscriptionRow {
    chat_id: i64,
    user_id: i64,
    is_active: bool,
    expired_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    /// Insertion order is preserved.
    chats: Vec<ChatRow>,
    subscriptions: Vec<SubscriptionRow>,
}

impl MemoryState {
    fn chat_mut(&mut self, chat_id: i64) -> Option<&mut ChatRow> {
        self.chats.iter_mut().find(|c| c.chat_id == chat_id)
    }

    fn subscription(&self, chat_id: i64, user_id: i64) -> Option<&SubscriptionRow> {
        self.subscriptions
            .iter()
            .find(|s| s.chat_id == chat_id && s.user_id == user_id)
    }
}

#[derive(Debug, Default)]
pub struct PaywallInMemory {
    state: Mutex<MemoryState>,
    closed: AtomicBool,
}

impl PaywallInMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expiry recorded for a subscription, if any.
    pub fn expired_date(&self, chat_id: i64, user_id: i64) -> Option<DateTime<Utc>> {
        let state = self.state.lock().ok()?;
        state.subscription(chat_id, user_id).map(|s| s.expired_date)
    }

    fn lock(&self, ctx: &OpContext) -> StorageResult<MutexGuard<'_, MemoryState>> {
        ctx.ensure_active()?;

        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::ConnectionFailure(
                "storage engine is closed".to_string(),
            ));
        }

        self.state
            .lock()
            .map_err(|_| StorageError::storage("in-memory state poisoned"))
    }

    fn read_state<T>(
        &self,
        ctx: &OpContext,
        work: impl FnOnce(&MemoryState) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let state = self.lock(ctx)?;
        work(&state)
    }

    fn write_state<T>(
        &self,
        ctx: &OpContext,
        work: impl FnOnce(&mut MemoryState) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut state = self.lock(ctx)?;

        // Work on a copy so a failed or cancelled operation leaves no trace.
        let mut draft = state.clone();
        let output = work(&mut draft)?;
        ctx.ensure_active()?;

        *state = draft;
        Ok(output)
    }
}

#[async_trait]
impl PaywallRepository for PaywallInMemory {
    async fn add_new_chat(
        &self,
        ctx: &OpContext,
        insert_chat_entity: InsertChatEntity,
    ) -> StorageResult<()> {
        self.write_state(ctx, |state| {
            if insert_chat_entity.price < 0 {
                return Err(StorageError::storage(format!(
                    "price must be non-negative, got {}",
                    insert_chat_entity.price
                )));
            }
            if state
                .chats
                .iter()
                .any(|c| c.chat_id == insert_chat_entity.chat_id)
            {
                return Err(StorageError::Conflict(format!(
                    "chat {} already exists",
                    insert_chat_entity.chat_id
                )));
            }

            state.chats.push(ChatRow {
                chat_id: insert_chat_entity.chat_id,
                owner_id: insert_chat_entity.owner_id,
                name: insert_chat_entity.name,
                description: insert_chat_entity.description,
                price: insert_chat_entity.price,
                is_active: insert_chat_entity.is_active,
            });
            Ok(())
        })
    }

    async fn get_chats_by_owner(
        &self,
        ctx: &OpContext,
        owner_id: i64,
    ) -> StorageResult<Vec<ChatInfo>> {
        self.read_state(ctx, |state| {
            Ok(state
                .chats
                .iter()
                .filter(|c| c.owner_id == owner_id)
                .map(|c| ChatInfo {
                    chat_id: c.chat_id,
                    name: c.name.clone(),
                    description: c.description.clone(),
                    price: c.price,
                    is_active: c.is_active,
                })
                .collect())
        })
    }

    async fn disable_chat(&self, ctx: &OpContext, chat_id: i64) -> StorageResult<()> {
        self.write_state(ctx, |state| {
            if let Some(chat) = state.chat_mut(chat_id) {
                chat.is_active = false;
            }
            Ok(())
        })
    }

    async fn change_description(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        description: String,
    ) -> StorageResult<()> {
        self.write_state(ctx, |state| {
            if let Some(chat) = state.chat_mut(chat_id) {
                chat.description = description;
            }
            Ok(())
        })
    }

    async fn change_price(&self, ctx: &OpContext, chat_id: i64, price: i64) -> StorageResult<()> {
        self.write_state(ctx, |state| {
            if price < 0 {
                return Err(StorageError::storage(format!(
                    "price must be non-negative, got {price}"
                )));
            }
            if let Some(chat) = state.chat_mut(chat_id) {
                chat.price = price;
            }
            Ok(())
        })
    }

    async fn list_subscribers(&self, ctx: &OpContext, chat_id: i64) -> StorageResult<Vec<i64>> {
        self.read_state(ctx, |state| {
            Ok(state
                .subscriptions
                .iter()
                .filter(|s| s.chat_id == chat_id)
                .map(|s| s.user_id)
                .collect())
        })
    }

    async fn new_subscribe(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        user_id: i64,
    ) -> StorageResult<()> {
        self.write_state(ctx, |state| {
            if state.subscription(chat_id, user_id).is_some() {
                return Err(StorageError::Conflict(format!(
                    "user {user_id} is already subscribed to chat {chat_id}"
                )));
            }

            state.subscriptions.push(SubscriptionRow {
                chat_id,
                user_id,
                is_active: false,
                expired_date: expiry_from(Utc::now()),
            });
            Ok(())
        })
    }

    async fn list_subscriptions(&self, ctx: &OpContext, user_id: i64) -> StorageResult<Vec<i64>> {
        self.read_state(ctx, |state| {
            Ok(state
                .subscriptions
                .iter()
                .filter(|s| s.user_id == user_id)
                .map(|s| s.chat_id)
                .collect())
        })
    }

    async fn pay(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> StorageResult<()> {
        self.write_state(ctx, |state| {
            if let Some(subscription) = state
                .subscriptions
                .iter_mut()
                .find(|s| s.chat_id == chat_id && s.user_id == user_id)
            {
                subscription.is_active = true;
            }
            Ok(())
        })
    }

    async fn is_subscribed(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        user_id: i64,
    ) -> StorageResult<bool> {
        self.read_state(ctx, |state| Ok(state.subscription(chat_id, user_id).is_some()))
    }

    async fn is_paid(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> StorageResult<bool> {
        self.read_state(ctx, |state| {
            Ok(state
                .subscription(chat_id, user_id)
                .is_some_and(|s| s.is_active))
        })
    }

    async fn close(&self) -> StorageResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::storage_errors::StorageErrorKind;
    use std::sync::Arc;

    fn chat(chat_id: i64, owner_id: i64, price: i64) -> InsertChatEntity {
        InsertChatEntity {
            chat_id,
            owner_id,
            name: format!("chat {chat_id}"),
            description: "daily digest".to_string(),
            price,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn duplicate_chat_leaves_original_untouched() {
        let store = PaywallInMemory::new();
        let ctx = OpContext::background();

        store.add_new_chat(&ctx, chat(1, 9, 100)).await.unwrap();
        let err = store.add_new_chat(&ctx, chat(1, 10, 500)).await.unwrap_err();

        assert_eq!(err.kind(), StorageErrorKind::Conflict);
        let chats = store.get_chats_by_owner(&ctx, 9).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].price, 100);
        assert!(store.get_chats_by_owner(&ctx, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chats_are_listed_in_insertion_order_including_disabled() {
        let store = PaywallInMemory::new();
        let ctx = OpContext::background();

        store.add_new_chat(&ctx, chat(30, 9, 1)).await.unwrap();
        store.add_new_chat(&ctx, chat(10, 9, 2)).await.unwrap();
        store.add_new_chat(&ctx, chat(20, 9, 3)).await.unwrap();
        store.disable_chat(&ctx, 10).await.unwrap();

        let chats = store.get_chats_by_owner(&ctx, 9).await.unwrap();
        let ids: Vec<i64> = chats.iter().map(|c| c.chat_id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
        assert!(!chats[1].is_active);
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let store = PaywallInMemory::new();
        let ctx = OpContext::background();

        let err = store.add_new_chat(&ctx, chat(1, 9, -5)).await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::StorageFailure);

        store.add_new_chat(&ctx, chat(1, 9, 5)).await.unwrap();
        let err = store.change_price(&ctx, 1, -1).await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::StorageFailure);
        assert_eq!(store.get_chats_by_owner(&ctx, 9).await.unwrap()[0].price, 5);
    }

    #[tokio::test]
    async fn expiry_is_anchored_at_subscribe_time() {
        let store = PaywallInMemory::new();
        let ctx = OpContext::background();
        let before = Utc::now();

        store.new_subscribe(&ctx, 1, 42).await.unwrap();
        let expiry = store.expired_date(1, 42).unwrap();
        store.pay(&ctx, 1, 42).await.unwrap();

        assert_eq!(store.expired_date(1, 42), Some(expiry));
        assert!(expiry >= expiry_from(before));
        assert!(expiry <= expiry_from(Utc::now()));
    }

    #[tokio::test]
    async fn cancelled_context_does_not_touch_state() {
        let store = PaywallInMemory::new();
        let ctx = OpContext::background();
        ctx.cancel();

        let err = store.new_subscribe(&ctx, 1, 42).await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::Cancelled);

        let fresh = OpContext::background();
        assert!(!store.is_subscribed(&fresh, 1, 42).await.unwrap());
    }

    #[tokio::test]
    async fn reads_check_context_and_close() {
        let store = PaywallInMemory::new();
        let ctx = OpContext::background();
        store.new_subscribe(&ctx, 1, 42).await.unwrap();

        let cancelled = OpContext::background();
        cancelled.cancel();
        let err = store.list_subscribers(&cancelled, 1).await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::Cancelled);
        assert_eq!(store.list_subscribers(&ctx, 1).await.unwrap(), vec![42]);

        store.close().await.unwrap();
        let err = store.list_subscribers(&ctx, 1).await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::ConnectionFailure);
    }

    #[tokio::test]
    async fn closed_store_fails_every_call() {
        let store = PaywallInMemory::new();
        let ctx = OpContext::background();

        store.close().await.unwrap();
        store.close().await.unwrap();

        let err = store.is_paid(&ctx, 1, 42).await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::ConnectionFailure);
    }

    #[tokio::test]
    async fn concurrent_duplicate_subscribe_yields_one_conflict() {
        let store = Arc::new(PaywallInMemory::new());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.new_subscribe(&OpContext::background(), 1, 42).await
                })
            })
            .collect();

        let mut conflicts = 0;
        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(err) if err.is_conflict() => conflicts += 1,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!((successes, conflicts), (1, 1));
        let subs = store
            .list_subscriptions(&OpContext::background(), 42)
            .await
            .unwrap();
        assert_eq!(subs, vec![1]);
    }
}
