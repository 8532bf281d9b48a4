// Services module - Business logic

pub mod auth_tokens;
pub mod boost;
pub mod passwords;
pub mod pix_gateway;
pub mod whatsapp;
