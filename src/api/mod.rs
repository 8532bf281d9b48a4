// API module - HTTP endpoints

pub mod admin;
pub mod ads;
pub mod auth;
pub mod boosts;
pub mod categories;
pub mod favorites;
pub mod health;
pub mod middleware;
pub mod uploads;
