use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use axum_extra::extract::WithRejection;

use crate::{
    application::usecases::paywall::PaywallUseCase,
    domain::{
        repositories::paywall::PaywallRepository,
        value_objects::subscriptions::{SubscriptionModel, UserModel},
    },
    infrastructure::axum_http::{
        default_routers, error_responses::ApiError, operation_scope::OperationScope,
    },
};

/// Subscriber-facing endpoints. POST only; any other method answers 404.
pub fn routes<T>(paywall_usecase: Arc<PaywallUseCase<T>>) -> Router
where
    T: PaywallRepository + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/new_subscribe",
            post(new_subscribe::<T>).fallback(default_routers::not_found),
        )
        .route(
            "/get_all_subscriptions",
            post(get_all_subscriptions::<T>).fallback(default_routers::not_found),
        )
        .route("/pay", post(pay::<T>).fallback(default_routers::not_found))
        .route(
            "/is_subscribe_exist",
            post(is_subscribe_exist::<T>).fallback(default_routers::not_found),
        )
        .route(
            "/is_paid",
            post(is_paid::<T>).fallback(default_routers::not_found),
        )
        .with_state(paywall_usecase)
}

pub async fn new_subscribe<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(subscription_model), _): WithRejection<Json<SubscriptionModel>, ApiError>,
) -> Result<StatusCode, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    paywall_usecase
        .new_subscribe(
            scope.ctx(),
            subscription_model.chat_id,
            subscription_model.user_id,
        )
        .await
        .map_err(ApiError::operation("failed to add new subscribe"))?;

    Ok(StatusCode::OK)
}

pub async fn get_all_subscriptions<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(user_model), _): WithRejection<Json<UserModel>, ApiError>,
) -> Result<Json<Vec<i64>>, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    let subscriptions = paywall_usecase
        .list_subscriptions(scope.ctx(), user_model.user_id)
        .await
        .map_err(ApiError::operation("failed to get all subs"))?;

    Ok(Json(subscriptions))
}

pub async fn pay<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(subscription_model), _): WithRejection<Json<SubscriptionModel>, ApiError>,
) -> Result<StatusCode, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    paywall_usecase
        .pay(
            scope.ctx(),
            subscription_model.chat_id,
            subscription_model.user_id,
        )
        .await
        .map_err(ApiError::operation("failed to pay"))?;

    Ok(StatusCode::OK)
}

pub async fn is_subscribe_exist<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(subscription_model), _): WithRejection<Json<SubscriptionModel>, ApiError>,
) -> Result<Json<bool>, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    let exists = paywall_usecase
        .is_subscribed(
            scope.ctx(),
            subscription_model.chat_id,
            subscription_model.user_id,
        )
        .await
        .map_err(ApiError::operation("failed check is subscribe exist"))?;

    Ok(Json(exists))
}

pub async fn is_paid<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(subscription_model), _): WithRejection<Json<SubscriptionModel>, ApiError>,
) -> Result<Json<bool>, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    let paid = paywall_usecase
        .is_paid(
            scope.ctx(),
            subscription_model.chat_id,
            subscription_model.user_id,
        )
        .await
        .map_err(ApiError::operation("failed check paid status"))?;

    Ok(Json(paid))
}
