pub mod cart_repo;
pub mod catalog_repo;
pub mod errors;
pub mod mailer;
pub mod models;
pub mod order_repo;
pub mod payment_repo;
pub mod security;
pub mod stripe;
pub mod uploads;
pub mod user_repo;

#[cfg(test)]
pub(crate) mod testing;
