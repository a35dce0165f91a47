pub mod chat;
pub mod errors;
pub mod events;
pub mod filters;
pub mod image;
pub mod models;
pub mod recipes;
pub mod session;
pub mod shopping;
pub mod speech;
