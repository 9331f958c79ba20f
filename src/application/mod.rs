pub mod account_service;
pub mod cart_service;
pub mod catalog_service;
pub mod order_service;
pub mod payment_service;

#[cfg(test)]
pub(crate) mod testing;
