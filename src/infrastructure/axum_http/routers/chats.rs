use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use axum_extra::extract::WithRejection;

use crate::{
    application::usecases::paywall::PaywallUseCase,
    domain::{
        repositories::paywall::PaywallRepository,
        value_objects::chats::{
            AddNewChatModel, ChangeDescriptionModel, ChangePriceModel, ChatInfo, ChatModel,
            OwnerModel,
        },
    },
    infrastructure::axum_http::{
        default_routers, error_responses::ApiError, operation_scope::OperationScope,
    },
};

/// Owner-facing endpoints. POST only; any other method answers 404.
pub fn routes<T>(paywall_usecase: Arc<PaywallUseCase<T>>) -> Router
where
    T: PaywallRepository + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/add_new_chat",
            post(add_new_chat::<T>).fallback(default_routers::not_found),
        )
        .route(
            "/get_chats",
            post(get_chats::<T>).fallback(default_routers::not_found),
        )
        .route(
            "/disable_chat",
            post(disable_chat::<T>).fallback(default_routers::not_found),
        )
        .route(
            "/change_description",
            post(change_description::<T>).fallback(default_routers::not_found),
        )
        .route(
            "/change_price",
            post(change_price::<T>).fallback(default_routers::not_found),
        )
        .route(
            "/get_all_slaves",
            post(get_all_slaves::<T>).fallback(default_routers::not_found),
        )
        .with_state(paywall_usecase)
}

pub async fn add_new_chat<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(add_new_chat_model), _): WithRejection<Json<AddNewChatModel>, ApiError>,
) -> Result<StatusCode, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    paywall_usecase
        .add_new_chat(scope.ctx(), add_new_chat_model)
        .await
        .map_err(ApiError::operation("failed to add new chat"))?;

    Ok(StatusCode::OK)
}

pub async fn get_chats<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(owner_model), _): WithRejection<Json<OwnerModel>, ApiError>,
) -> Result<Json<Vec<ChatInfo>>, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    let chats = paywall_usecase
        .get_chats_by_owner(scope.ctx(), owner_model.owner_id)
        .await
        .map_err(ApiError::operation("failed to get chats by owner id"))?;

    Ok(Json(chats))
}

pub async fn disable_chat<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(chat_model), _): WithRejection<Json<ChatModel>, ApiError>,
) -> Result<StatusCode, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    paywall_usecase
        .disable_chat(scope.ctx(), chat_model.chat_id)
        .await
        .map_err(ApiError::operation("failed to disable chat"))?;

    Ok(StatusCode::OK)
}

pub async fn change_description<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(change_description_model), _): WithRejection<
        Json<ChangeDescriptionModel>,
        ApiError,
    >,
) -> Result<StatusCode, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    paywall_usecase
        .change_description(
            scope.ctx(),
            change_description_model.chat_id,
            change_description_model.description,
        )
        .await
        .map_err(ApiError::operation("failed to change description"))?;

    Ok(StatusCode::OK)
}

pub async fn change_price<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(change_price_model), _): WithRejection<Json<ChangePriceModel>, ApiError>,
) -> Result<StatusCode, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    paywall_usecase
        .change_price(
            scope.ctx(),
            change_price_model.chat_id,
            change_price_model.price,
        )
        .await
        .map_err(ApiError::operation("failed to change price"))?;

    Ok(StatusCode::OK)
}

pub async fn get_all_slaves<T>(
    State(paywall_usecase): State<Arc<PaywallUseCase<T>>>,
    scope: OperationScope,
    WithRejection(Json(chat_model), _): WithRejection<Json<ChatModel>, ApiError>,
) -> Result<Json<Vec<i64>>, ApiError>
where
    T: PaywallRepository + Send + Sync,
{
    let subscribers = paywall_usecase
        .list_subscribers(scope.ctx(), chat_model.chat_id)
        .await
        .map_err(ApiError::operation("failed to get all slaves"))?;

    Ok(Json(subscribers))
}
