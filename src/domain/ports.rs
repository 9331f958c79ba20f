use uuid::Uuid;

use super::auth::Principal;
use super::cart::CartView;
use super::catalog::{CategoryView, NewProduct, ProductPatch, ProductQuery, ProductView};
use super::errors::DomainError;
use super::order::{OrderLineInput, OrderStatus, OrderView};
use super::payment::{
    GatewayIntent, NewPayment, PaymentIntentStatus, PaymentMetadata, PaymentView,
};
use super::upload::SignedUpload;
use super::user::{NewUser, UserRecord};

pub trait CatalogRepository: Send + Sync + 'static {
    fn list(&self, query: &ProductQuery) -> Result<Vec<ProductView>, DomainError>;
    fn find_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<ProductView>, DomainError>;
    fn create(&self, product: NewProduct) -> Result<ProductView, DomainError>;
    fn update(&self, id: Uuid, patch: ProductPatch) -> Result<ProductView, DomainError>;
    fn delete(&self, id: Uuid) -> Result<ProductView, DomainError>;
    fn attach_image(&self, product_id: Uuid, url: String) -> Result<ProductView, DomainError>;
    /// Flips the like relation and returns whether the product is now liked.
    fn toggle_like(&self, product_id: Uuid, user_id: Uuid) -> Result<bool, DomainError>;
}

pub trait CategoryRepository: Send + Sync + 'static {
    fn list(&self) -> Result<Vec<CategoryView>, DomainError>;
    fn find_by_id(&self, id: i32) -> Result<Option<CategoryView>, DomainError>;
    fn create(&self, name: String) -> Result<CategoryView, DomainError>;
    fn rename(&self, id: i32, name: String) -> Result<CategoryView, DomainError>;
    fn delete(&self, id: i32) -> Result<CategoryView, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError>;
    fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;
    /// Returns whether an item was removed.
    fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError>;
    fn clear(&self, user_id: Uuid) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Inserts the order and its details and decrements stock, all in one
    /// transaction. Fails with `InsufficientStock` and leaves no trace if any
    /// product cannot cover its line.
    fn place(&self, customer_id: Uuid, lines: &[OrderLineInput]) -> Result<OrderView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list(&self, customer_id: Option<Uuid>) -> Result<Vec<OrderView>, DomainError>;
    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError>;
    /// Adds every detail quantity of the order back to its product, in one transaction.
    fn restock(&self, id: Uuid) -> Result<(), DomainError>;
    /// Marks the order CANCELLED and restocks its details in one transaction.
    /// Returns the status it had before, or `None` when it was already
    /// cancelled, in which case nothing is restocked.
    fn cancel_and_restock(&self, id: Uuid) -> Result<Option<OrderStatus>, DomainError>;
}

pub trait PaymentRepository: Send + Sync + 'static {
    fn create(&self, payment: NewPayment) -> Result<PaymentView, DomainError>;
    fn set_intent_status(
        &self,
        gateway_ref: &str,
        status: PaymentIntentStatus,
    ) -> Result<(), DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    /// Creates the user together with an empty cart.
    fn create(&self, user: NewUser) -> Result<UserRecord, DomainError>;
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DomainError>;
    fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), DomainError>;
}

pub trait PaymentGateway: Send + Sync + 'static {
    fn create_payment_intent(
        &self,
        amount_in_cents: i64,
        currency: &str,
        metadata: &PaymentMetadata,
    ) -> Result<GatewayIntent, DomainError>;
}

pub trait Mailer: Send + Sync + 'static {
    fn send_password_reset(&self, recipient: &str, reset_url: &str) -> Result<(), DomainError>;
}

pub trait PasswordHasher: Send + Sync + 'static {
    fn hash(&self, secret: &str) -> Result<String, DomainError>;
    fn verify(&self, secret: &str, hash: &str) -> Result<bool, DomainError>;
}

pub trait TokenIssuer: Send + Sync + 'static {
    fn issue_access(&self, principal: &Principal) -> Result<String, DomainError>;
    fn verify_access(&self, token: &str) -> Result<Principal, DomainError>;
    fn issue_reset(&self, principal: &Principal) -> Result<String, DomainError>;
    fn verify_reset(&self, token: &str) -> Result<Principal, DomainError>;
}

pub trait UploadSigner: Send + Sync + 'static {
    fn sign_upload(&self) -> SignedUpload;
}
