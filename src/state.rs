use std::sync::Arc;

use crate::application::account_service::AccountService;
use crate::application::cart_service::CartService;
use crate::application::catalog_service::CatalogService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{TokenIssuer, UploadSigner};
use crate::infrastructure::cart_repo::DieselCartRepository;
use crate::infrastructure::catalog_repo::{DieselCatalogRepository, DieselCategoryRepository};
use crate::infrastructure::mailer::LogMailer;
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::payment_repo::DieselPaymentRepository;
use crate::infrastructure::security::{BcryptHasher, JwtTokens};
use crate::infrastructure::stripe::{StripeGateway, StripeWebhookVerifier};
use crate::infrastructure::uploads::CloudinarySigner;
use crate::infrastructure::user_repo::DieselUserRepository;

/// Service handles shared by every worker; built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub carts: CartService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub accounts: AccountService,
    pub tokens: Arc<dyn TokenIssuer>,
    pub webhooks: Arc<StripeWebhookVerifier>,
    pub uploads: Arc<dyn UploadSigner>,
}

impl AppState {
    /// Wires the diesel repositories and external adapters together.
    ///
    /// Builds a blocking HTTP client, so call it before the actix system starts.
    pub fn build(pool: DbPool, config: &AppConfig) -> Result<Self, DomainError> {
        let products = Arc::new(DieselCatalogRepository::new(pool.clone()));
        let categories = Arc::new(DieselCategoryRepository::new(pool.clone()));
        let carts = Arc::new(DieselCartRepository::new(pool.clone()));
        let order_repo = Arc::new(DieselOrderRepository::new(pool.clone()));
        let payment_repo = Arc::new(DieselPaymentRepository::new(pool.clone()));
        let users = Arc::new(DieselUserRepository::new(pool));

        let tokens: Arc<dyn TokenIssuer> = Arc::new(JwtTokens::new(
            &config.access_token_secret,
            config.access_token_ttl,
            &config.reset_token_secret,
            config.reset_token_ttl,
        ));
        let gateway = Arc::new(StripeGateway::new(
            &config.stripe.api_base,
            &config.stripe.api_key,
        )?);

        let orders = OrderService::new(order_repo, carts.clone());
        Ok(Self {
            catalog: CatalogService::new(products.clone(), categories),
            carts: CartService::new(carts, products),
            payments: PaymentService::new(
                orders.clone(),
                payment_repo,
                gateway,
                config.stripe.currency.clone(),
            ),
            orders,
            accounts: AccountService::new(
                users,
                Arc::new(BcryptHasher::default()),
                tokens.clone(),
                Arc::new(LogMailer::new(config.mail_sender.clone())),
                config.frontend_url.clone(),
            ),
            tokens,
            webhooks: Arc::new(StripeWebhookVerifier::new(&config.stripe.webhook_secret)),
            uploads: Arc::new(CloudinarySigner::new(
                &config.cloudinary.cloud_name,
                &config.cloudinary.api_key,
                &config.cloudinary.api_secret,
            )),
        })
    }
}
