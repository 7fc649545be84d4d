pub mod chats;
pub mod op_context;
pub mod storage_errors;
pub mod subscriptions;
