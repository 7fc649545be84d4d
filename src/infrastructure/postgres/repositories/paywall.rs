use std::fmt::Display;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    PgConnection, RunQueryDsl,
    dsl::exists,
    insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_query,
    sql_types::Text,
    update,
};
use tokio::task;
use tracing::{debug, info, info_span, warn};

use crate::{
    domain::{
        entities::{
            chats::{ChatEntity, InsertChatEntity},
            subscriptions::InsertSubscriptionEntity,
        },
        repositories::paywall::PaywallRepository,
        value_objects::{
            chats::ChatInfo,
            op_context::OpContext,
            storage_errors::{StorageError, StorageResult},
            subscriptions::expiry_from,
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{chat, users},
    },
};

impl From<DieselError> for StorageError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StorageError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(
                DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand,
                info,
            ) => StorageError::ConnectionFailure(info.message().to_string()),
            other => StorageError::storage(other),
        }
    }
}

fn conflict_on_duplicate(err: DieselError, conflict: impl FnOnce() -> String) -> StorageError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StorageError::Conflict(conflict())
        }
        other => StorageError::from(other),
    }
}

#[derive(Debug, Clone, Copy)]
enum TxMode {
    /// READ ONLY + REPEATABLE READ: every row of a listing comes from one snapshot.
    ReadSnapshot,
    Write,
}

/// PostgreSQL storage engine. Holds the shared pool until `close` is called.
pub struct PaywallPostgres {
    db_pool: RwLock<Option<Arc<PgPoolSquad>>>,
}

impl PaywallPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self {
            db_pool: RwLock::new(Some(db_pool)),
        }
    }

    fn pool(&self) -> StorageResult<Arc<PgPoolSquad>> {
        let slot = self
            .db_pool
            .read()
            .map_err(|_| StorageError::ConnectionFailure("pool handle poisoned".to_string()))?;

        slot.clone()
            .ok_or_else(|| StorageError::ConnectionFailure("storage engine is closed".to_string()))
    }

    /// Runs `work` inside one transaction on the blocking threadpool (Diesel is
    /// synchronous). The context is checked before a connection is taken and again
    /// right before commit. A caller that gives up is answered at once only while
    /// the commit has not started; past that point the real outcome is awaited, so
    /// an error result always means nothing was written.
    async fn run_in_transaction<T, F>(
        &self,
        ctx: &OpContext,
        mode: TxMode,
        operation: &'static str,
        work: F,
    ) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StorageResult<T> + Send + 'static,
    {
        ctx.ensure_active()?;

        let db_pool = self.pool()?;
        let guard = ctx.clone();
        let gate = Arc::new(CommitGate::default());
        let job_gate = Arc::clone(&gate);
        let span = info_span!("postgres", operation, mode = ?mode);

        let mut handle = task::spawn_blocking(move || -> StorageResult<T> {
            let _entered = span.enter();

            let checkout = match guard.remaining() {
                Some(left) => db_pool.get_timeout(left),
                None => db_pool.get(),
            };
            let mut conn = checkout.map_err(|err| checkout_failed(&guard, err))?;

            guard.ensure_active()?;

            let mut transaction = conn.build_transaction();
            if let TxMode::ReadSnapshot = mode {
                transaction = transaction.read_only().repeatable_read();
            }

            let result = transaction.run(|tx| {
                if let Some(left) = guard.remaining() {
                    set_statement_timeout(tx, left)?;
                }

                let output = work(tx)?;

                guard.ensure_active()?;
                if !job_gate.begin_commit() {
                    return Err(StorageError::Cancelled);
                }
                Ok(output)
            });

            match result {
                // The server cancelled the statement because the deadline ran out.
                Err(StorageError::StorageFailure(_)) if guard.is_expired() => {
                    Err(StorageError::DeadlineExceeded)
                }
                other => other,
            }
        });

        tokio::select! {
            joined = &mut handle => joined.map_err(StorageError::storage)?,
            err = ctx.done() => {
                if gate.abandon() {
                    warn!(operation, error = %err, "postgres: operation abandoned by caller");
                    return Err(err);
                }

                debug!(operation, "postgres: commit already in flight, awaiting outcome");
                handle.await.map_err(StorageError::storage)?
            }
        }
    }
}

/// Settles, exactly once, whether a transaction commits or is abandoned by its
/// caller.
#[derive(Debug, Default)]
struct CommitGate(AtomicU8);

impl CommitGate {
    const OPEN: u8 = 0;
    const COMMITTING: u8 = 1;
    const ABANDONED: u8 = 2;

    /// Claims the commit. Refused once the caller has abandoned the transaction.
    fn begin_commit(&self) -> bool {
        self.0
            .compare_exchange(Self::OPEN, Self::COMMITTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Abandons the transaction. Refused once the commit is under way.
    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(Self::OPEN, Self::ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// A checkout that ran out of the caller's time is a deadline, not a broken pool.
fn checkout_failed(ctx: &OpContext, err: impl Display) -> StorageError {
    if ctx.is_expired() {
        StorageError::DeadlineExceeded
    } else {
        StorageError::ConnectionFailure(err.to_string())
    }
}

/// Transaction-local `statement_timeout`, so the server aborts a round trip that
/// outlives the caller's deadline.
fn set_statement_timeout(conn: &mut PgConnection, left: Duration) -> StorageResult<()> {
    // Zero would disable the timeout altogether.
    let millis = left.as_millis().max(1).to_string();

    sql_query("SELECT set_config('statement_timeout', $1, true)")
        .bind::<Text, _>(millis)
        .execute(conn)?;

    Ok(())
}

#[async_trait]
impl PaywallRepository for PaywallPostgres {
    async fn add_new_chat(
        &self,
        ctx: &OpContext,
        insert_chat_entity: InsertChatEntity,
    ) -> StorageResult<()> {
        self.run_in_transaction(ctx, TxMode::Write, "add_new_chat", move |conn| {
            let chat_id = insert_chat_entity.chat_id;

            insert_into(chat::table)
                .values(&insert_chat_entity)
                .execute(conn)
                .map_err(|err| {
                    conflict_on_duplicate(err, || format!("chat {chat_id} already exists"))
                })?;

            Ok(())
        })
        .await
    }

    async fn get_chats_by_owner(
        &self,
        ctx: &OpContext,
        owner_id: i64,
    ) -> StorageResult<Vec<ChatInfo>> {
        self.run_in_transaction(ctx, TxMode::ReadSnapshot, "get_chats_by_owner", move |conn| {
            let results = chat::table
                .filter(chat::owner_id.eq(owner_id))
                .order((chat::created_at.asc(), chat::chat_id.asc()))
                .select(ChatEntity::as_select())
                .load::<ChatEntity>(conn)?;

            debug!(owner_id, rows = results.len(), "postgres: get_chats_by_owner loaded");
            Ok(results.into_iter().map(ChatInfo::from).collect())
        })
        .await
    }

    async fn disable_chat(&self, ctx: &OpContext, chat_id: i64) -> StorageResult<()> {
        self.run_in_transaction(ctx, TxMode::Write, "disable_chat", move |conn| {
            let affected = update(chat::table)
                .filter(chat::chat_id.eq(chat_id))
                .set(chat::is_active.eq(false))
                .execute(conn)?;

            debug!(chat_id, affected, "postgres: disable_chat applied");
            Ok(())
        })
        .await
    }

    async fn change_description(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        description: String,
    ) -> StorageResult<()> {
        self.run_in_transaction(ctx, TxMode::Write, "change_description", move |conn| {
            let affected = update(chat::table)
                .filter(chat::chat_id.eq(chat_id))
                .set(chat::description.eq(description))
                .execute(conn)?;

            debug!(chat_id, affected, "postgres: change_description applied");
            Ok(())
        })
        .await
    }

    async fn change_price(&self, ctx: &OpContext, chat_id: i64, price: i64) -> StorageResult<()> {
        self.run_in_transaction(ctx, TxMode::Write, "change_price", move |conn| {
            let affected = update(chat::table)
                .filter(chat::chat_id.eq(chat_id))
                .set(chat::price.eq(price))
                .execute(conn)?;

            debug!(chat_id, price, affected, "postgres: change_price applied");
            Ok(())
        })
        .await
    }

    async fn list_subscribers(&self, ctx: &OpContext, chat_id: i64) -> StorageResult<Vec<i64>> {
        self.run_in_transaction(ctx, TxMode::ReadSnapshot, "list_subscribers", move |conn| {
            let results = users::table
                .filter(users::chat_id.eq(chat_id))
                .order((users::created_at.asc(), users::user_id.asc()))
                .select(users::user_id)
                .load::<i64>(conn)?;

            debug!(chat_id, rows = results.len(), "postgres: list_subscribers loaded");
            Ok(results)
        })
        .await
    }

    async fn new_subscribe(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        user_id: i64,
    ) -> StorageResult<()> {
        self.run_in_transaction(ctx, TxMode::Write, "new_subscribe", move |conn| {
            let insert_subscription_entity = InsertSubscriptionEntity {
                chat_id,
                user_id,
                is_active: false,
                expired_date: expiry_from(Utc::now()),
            };

            insert_into(users::table)
                .values(&insert_subscription_entity)
                .execute(conn)
                .map_err(|err| {
                    conflict_on_duplicate(err, || {
                        format!("user {user_id} is already subscribed to chat {chat_id}")
                    })
                })?;

            Ok(())
        })
        .await
    }

    async fn list_subscriptions(&self, ctx: &OpContext, user_id: i64) -> StorageResult<Vec<i64>> {
        self.run_in_transaction(ctx, TxMode::ReadSnapshot, "list_subscriptions", move |conn| {
            let results = users::table
                .filter(users::user_id.eq(user_id))
                .order((users::created_at.asc(), users::chat_id.asc()))
                .select(users::chat_id)
                .load::<i64>(conn)?;

            debug!(user_id, rows = results.len(), "postgres: list_subscriptions loaded");
            Ok(results)
        })
        .await
    }

    async fn pay(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> StorageResult<()> {
        self.run_in_transaction(ctx, TxMode::Write, "pay", move |conn| {
            let affected = update(users::table)
                .filter(users::chat_id.eq(chat_id))
                .filter(users::user_id.eq(user_id))
                .set(users::is_active.eq(true))
                .execute(conn)?;

            if affected == 0 {
                debug!(chat_id, user_id, "postgres: pay matched no subscription");
            }
            Ok(())
        })
        .await
    }

    async fn is_subscribed(
        &self,
        ctx: &OpContext,
        chat_id: i64,
        user_id: i64,
    ) -> StorageResult<bool> {
        self.run_in_transaction(ctx, TxMode::ReadSnapshot, "is_subscribed", move |conn| {
            let found = diesel::select(exists(
                users::table
                    .filter(users::chat_id.eq(chat_id))
                    .filter(users::user_id.eq(user_id)),
            ))
            .get_result::<bool>(conn)?;

            debug!(chat_id, user_id, found, "postgres: is_subscribed checked");
            Ok(found)
        })
        .await
    }

    async fn is_paid(&self, ctx: &OpContext, chat_id: i64, user_id: i64) -> StorageResult<bool> {
        self.run_in_transaction(ctx, TxMode::ReadSnapshot, "is_paid", move |conn| {
            let paid = users::table
                .filter(users::chat_id.eq(chat_id))
                .filter(users::user_id.eq(user_id))
                .select(users::is_active)
                .first::<bool>(conn)
                .optional()?;

            debug!(chat_id, user_id, paid = ?paid, "postgres: is_paid checked");
            Ok(paid.unwrap_or(false))
        })
        .await
    }

    async fn close(&self) -> StorageResult<()> {
        let mut slot = self
            .db_pool
            .write()
            .map_err(|_| StorageError::ConnectionFailure("pool handle poisoned".to_string()))?;

        // Connections are released once in-flight operations drop their clones.
        if slot.take().is_some() {
            info!("postgres: storage engine closed");
        }

        Ok(())
    }
}
