use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::auth::Principal;
use crate::domain::cart::CartView;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CatalogRepository};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn CatalogRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn CatalogRepository>) -> Self {
        Self { carts, products }
    }

    pub fn get_cart(&self, user: &Principal) -> Result<CartView, DomainError> {
        Ok(self
            .carts
            .find_by_user(user.user_id)?
            .unwrap_or_else(|| CartView {
                id: Uuid::nil(),
                user_id: user.user_id,
                created_at: Utc::now(),
                items: vec![],
            }))
    }

    /// Sets the quantity of a product in the caller's cart; zero removes it.
    pub fn update_item(
        &self,
        user: &Principal,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity < 0 {
            return Err(DomainError::invalid("Quantity cannot be a negative number"));
        }
        if !self.can_use_product(product_id, user)? {
            return Err(DomainError::invalid("Product cannot be interacted with"));
        }

        if quantity > 0 {
            self.carts.set_quantity(user.user_id, product_id, quantity)?;
        } else {
            self.carts.remove_item(user.user_id, product_id)?;
        }
        self.get_cart(user)
    }

    pub fn remove_item(&self, user: &Principal, product_id: Uuid) -> Result<CartView, DomainError> {
        let active = self
            .products
            .find_by_id(product_id, None)?
            .is_some_and(|p| p.is_active);
        if !active {
            return Err(DomainError::NotFound(
                "No such active product could be found".to_string(),
            ));
        }
        if !self.carts.remove_item(user.user_id, product_id)? {
            return Err(DomainError::NotFound("Product is not in the cart".to_string()));
        }
        self.get_cart(user)
    }

    pub fn clear(&self, user: &Principal) -> Result<CartView, DomainError> {
        self.carts.clear(user.user_id)?;
        self.get_cart(user)
    }

    fn can_use_product(&self, product_id: Uuid, user: &Principal) -> Result<bool, DomainError> {
        Ok(self
            .products
            .find_by_id(product_id, Some(user.user_id))?
            .is_some_and(|p| p.is_active || user.is_manager()))
    }
}
