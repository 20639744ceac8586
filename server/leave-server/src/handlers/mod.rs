pub mod app_logs;
pub mod health;
