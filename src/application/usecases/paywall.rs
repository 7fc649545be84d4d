use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{
    entities::chats::InsertChatEntity,
    repositories::paywall::PaywallRepository,
    value_objects::{
        chats::{AddNewChatModel, ChatInfo},
        op_context::OpContext,
        storage_errors::{StorageError, StorageErrorKind},
    },
};

/// A storage failure tagged with the service operation that hit it.
#[derive(Debug, Error)]
#[error("failed to {operation}: {source}")]
pub struct PaywallError {
    pub operation: &'static str,
    #[source]
    pub source: StorageError,
}

impl PaywallError {
    pub fn kind(&self) -> StorageErrorKind {
        self.source.kind()
    }

    pub fn is_conflict(&self) -> bool {
        self.source.is_conflict()
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaywallError>;

fn failed(operation: &'static str, source: StorageError) -> PaywallError {
    match source.kind() {
        StorageErrorKind::Conflict => {
            warn!(operation, error = %source, "paywall: operation rejected");
        }
        StorageErrorKind::Cancelled | StorageErrorKind::DeadlineExceeded => {
            warn!(operation, error = %source, "paywall: operation interrupted");
        }
        StorageErrorKind::ConnectionFailure | StorageErrorKind::StorageFailure => {
            error!(operation, db_error = ?source, "paywall: operation failed");
        }
    }

    PaywallError { operation, source }
}

/// Chat-management and subscription-management operations. Stateless: every call
/// is a single round trip into the storage engine.
pub struct PaywallUseCase<T>
where
    T: PaywallRepository + Send + Sync,
{
    paywall_repository: Arc<T>,
}

impl<T> PaywallUseCase<T>
where
    T: PaywallRepository + Send + Sync,
{
    pub fn new(paywall_repository: Arc<T>) -> Self {
        Self { paywall_repository }
    }

    pub async fn add_new_chat(
        &self,
        ctx: &OpContext,
        add_new_chat_model: AddNewChatModel,
    ) -> UseCaseResult<()> {
        info!(
            chat_id = add_new_chat_model.chat_id,
            owner_id = add_new_chat_model.owner_id,
            price = add_new_chat_model.price,
            "paywall: adding new chat"
        );

        self.paywall_repository
            .add_new_chat(ctx, InsertChatEntity::from(add_new_chat_model))
            .await
            .map_err(|err| failed("add new chat", err))
    }

    pub async fn get_chats_by_owner(
        &self,
        ctx: &OpContext,
        owner_id: i64,
    ) -> UseCaseResult<Vec<ChatInfo>> {
        let chats = self
            .paywall_repository
            .get_chats_by_owner(ctx, owner_id)
            .await
            .map_err(|err| failed("get chats by owner", err))?;

        info!(owner_id, chat_count = chats.len(), "paywall: chats loaded");
        Ok(chats)
    }

    pub async fn disable_chat(&self, ctx: &OpContext, chat_id: i64) -> UseCaseResult<()> {
        info!(chat_id, "paywall: disabling chat");

        self.paywall_repository
            .disable_chat(ctx, chat_id)
            .await
            .map_err(|err| failed("disable chat", err))
    }

    pub async fn change_description(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        description: String,
    ) -> UseCaseResult<()> {
        info!(chat_id, "paywall: changing description");

        self.paywall_repository
            .change_description(ctx, chat_id, description)
            .await
            .map_err(|err| failed("change description", err))
    }

    pub async fn change_price(&self, ctx: &OpContext, chat_id: i64, price: i64) -> UseCaseResult<()> {
        info!(chat_id, price, "paywall: changing price");

        self.paywall_repository
            .change_price(ctx, chat_id, price)
            .await
            .map_err(|err| failed("change price", err))
    }

    pub async fn list_subscribers(&self, ctx: &OpContext, chat_id: i64) -> UseCaseResult<Vec<i64>> {
        let subscribers = self
            .paywall_repository
            .list_subscribers(ctx, chat_id)
            .await
            .map_err(|err| failed("list subscribers", err))?;

        info!(
            chat_id,
            subscriber_count = subscribers.len(),
            "paywall: subscribers loaded"
        );
        Ok(subscribers)
    }

    pub async fn new_subscribe(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> UseCaseResult<()> {
        info!(chat_id, user_id, "paywall: new subscription requested");

        self.paywall_repository
            .new_subscribe(ctx, chat_id, user_id)
            .await
            .map_err(|err| failed("add new subscription", err))
    }

    pub async fn list_subscriptions(
        &self,
        ctx: &OpContext,
        user_id: i64,
    ) -> UseCaseResult<Vec<i64>> {
        let subscriptions = self
            .paywall_repository
            .list_subscriptions(ctx, user_id)
            .await
            .map_err(|err| failed("list subscriptions", err))?;

        info!(
            user_id,
            subscription_count = subscriptions.len(),
            "paywall: subscriptions loaded"
        );
        Ok(subscriptions)
    }

    pub async fn pay(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> UseCaseResult<()> {
        info!(chat_id, user_id, "paywall: recording payment");

        self.paywall_repository
            .pay(ctx, chat_id, user_id)
            .await
            .map_err(|err| failed("pay", err))
    }

    pub async fn is_subscribed(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        user_id: i64,
    ) -> UseCaseResult<bool> {
        self.paywall_repository
            .is_subscribed(ctx, chat_id, user_id)
            .await
            .map_err(|err| failed("check subscription", err))
    }

    pub async fn is_paid(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> UseCaseResult<bool> {
        self.paywall_repository
            .is_paid(ctx, chat_id, user_id)
            .await
            .map_err(|err| failed("check paid status", err))
    }

    /// Closes the storage engine. Called once at shutdown.
    pub async fn close(&self) -> UseCaseResult<()> {
        info!("paywall: closing storage engine");

        self.paywall_repository
            .close()
            .await
            .map_err(|err| failed("close storage engine", err))
    }
}
