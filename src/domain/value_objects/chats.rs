use serde::{Deserialize, Serialize};

use crate::domain::entities::chats::{ChatEntity, InsertChatEntity};

/// Summary of a chat as shown to its owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatInfo {
    pub chat_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub is_active: bool,
}

impl From<ChatEntity> for ChatInfo {
    fn from(entity: ChatEntity) -> Self {
        Self {
            chat_id: entity.chat_id,
            name: entity.name,
            description: entity.description,
            price: entity.price,
            is_active: entity.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNewChatModel {
    pub chat_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
}

impl From<AddNewChatModel> for InsertChatEntity {
    fn from(model: AddNewChatModel) -> Self {
        Self {
            chat_id: model.chat_id,
            owner_id: model.owner_id,
            name: model.name,
            description: model.description,
            price: model.price,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerModel {
    pub owner_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatModel {
    pub chat_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDescriptionModel {
    pub chat_id: i64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePriceModel {
    pub chat_id: i64,
    pub price: i64,
}
