pub mod animals;
pub mod api_router;
pub mod appointments;
pub mod audit;
pub mod auth;
pub mod config;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod insights;
pub mod llm;
pub mod payments;
pub mod products;
pub mod reminders;
pub mod shared;
pub mod tests;
pub mod transactions;
