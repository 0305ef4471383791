pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod locks;
pub mod models;
pub mod paging;
pub mod schedule;
pub mod services;
pub mod state;
