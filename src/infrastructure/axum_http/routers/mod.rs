pub mod chats;
pub mod subscriptions;
