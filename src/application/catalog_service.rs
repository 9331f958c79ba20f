use std::sync::Arc;

use uuid::Uuid;

use crate::domain::auth::Principal;
use crate::domain::catalog::{
    validate_category_name, CategoryView, NewProduct, ProductFilter, ProductPatch, ProductView,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogRepository, CategoryRepository};

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn CatalogRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn CatalogRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            products,
            categories,
        }
    }

    pub fn list_products(
        &self,
        filter: ProductFilter,
        viewer: Option<&Principal>,
    ) -> Result<Vec<ProductView>, DomainError> {
        self.products.list(&filter.compose(viewer))
    }

    /// Inactive products are only visible to managers.
    pub fn get_product(
        &self,
        id: Uuid,
        viewer: Option<&Principal>,
    ) -> Result<ProductView, DomainError> {
        let product = self
            .products
            .find_by_id(id, viewer.map(|p| p.user_id))?
            .ok_or_else(|| DomainError::not_found("Product"))?;

        if !product.is_active && !viewer.is_some_and(Principal::is_manager) {
            return Err(DomainError::forbidden());
        }
        Ok(product)
    }

    pub fn create_product(&self, product: NewProduct) -> Result<ProductView, DomainError> {
        product.validate()?;
        let created = self.products.create(product)?;
        log::info!("Created product {} ({})", created.id, created.name);
        Ok(created)
    }

    pub fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<ProductView, DomainError> {
        patch.validate()?;
        self.products.update(id, patch)
    }

    pub fn remove_product(&self, id: Uuid) -> Result<ProductView, DomainError> {
        let removed = self.products.delete(id)?;
        log::info!("Removed product {}", removed.id);
        Ok(removed)
    }

    pub fn attach_image(&self, product_id: Uuid, url: String) -> Result<ProductView, DomainError> {
        if url.trim().is_empty() {
            return Err(DomainError::invalid("image url must not be empty"));
        }
        self.products.attach_image(product_id, url)
    }

    pub fn toggle_like(&self, product_id: Uuid, user: &Principal) -> Result<bool, DomainError> {
        self.get_product(product_id, Some(user))?;
        self.products.toggle_like(product_id, user.user_id)
    }

    pub fn list_categories(&self) -> Result<Vec<CategoryView>, DomainError> {
        self.categories.list()
    }

    pub fn get_category(&self, id: i32) -> Result<CategoryView, DomainError> {
        self.categories
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("Category"))
    }

    pub fn create_category(&self, name: String) -> Result<CategoryView, DomainError> {
        validate_category_name(&name)?;
        self.categories.create(name)
    }

    pub fn rename_category(&self, id: i32, name: String) -> Result<CategoryView, DomainError> {
        validate_category_name(&name)?;
        self.categories.rename(id, name)
    }

    pub fn remove_category(&self, id: i32) -> Result<CategoryView, DomainError> {
        self.categories.delete(id)
    }
}
