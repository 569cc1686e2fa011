pub mod aggregate;
pub mod auth;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod derived;
pub mod error;
pub mod event;
pub mod hub;
pub mod live;
pub mod model;
pub mod path;
pub mod session;
pub mod store;
pub mod types;
pub mod upload;
