pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

use std::error::Error;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use config::AppConfig;
pub use db::{create_pool, DbPool};
pub use state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Storefront API"),
    paths(
        handlers::accounts::signup,
        handlers::accounts::login,
        handlers::accounts::forgot_password,
        handlers::accounts::reset_password,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::create_product,
        handlers::catalog::update_product,
        handlers::catalog::delete_product,
        handlers::catalog::attach_image,
        handlers::catalog::toggle_like,
        handlers::catalog::list_categories,
        handlers::catalog::get_category,
        handlers::catalog::create_category,
        handlers::catalog::rename_category,
        handlers::catalog::delete_category,
        handlers::cart::get_cart,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::orders::list_orders,
        handlers::orders::my_orders,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
        handlers::payments::create_payment,
        handlers::payments::payment_webhook,
        handlers::images::signed_upload,
    ),
    components(schemas(
        handlers::accounts::SignUpRequest,
        handlers::accounts::LoginRequest,
        handlers::accounts::ForgotPasswordRequest,
        handlers::accounts::ResetPasswordRequest,
        handlers::accounts::SessionResponse,
        handlers::accounts::UserResponse,
        handlers::accounts::MessageResponse,
        handlers::catalog::ProductResponse,
        handlers::catalog::ImageResponse,
        handlers::catalog::CategoryResponse,
        handlers::catalog::CreateProductRequest,
        handlers::catalog::UpdateProductRequest,
        handlers::catalog::AttachImageRequest,
        handlers::catalog::LikeResponse,
        handlers::catalog::CategoryRequest,
        handlers::cart::CartResponse,
        handlers::cart::CartItemResponse,
        handlers::cart::UpdateCartItemRequest,
        handlers::orders::OrderResponse,
        handlers::orders::OrderDetailResponse,
        handlers::orders::PaymentResponse,
        handlers::orders::PaymentIntentResponse,
        handlers::orders::UpdateOrderStatusRequest,
        handlers::payments::CheckoutResponse,
        handlers::payments::WebhookAck,
        handlers::images::SignedUploadResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Sign-up, login and password reset"),
        (name = "catalog", description = "Products, categories and likes"),
        (name = "cart", description = "The caller's shopping cart"),
        (name = "orders", description = "Placed orders"),
        (name = "payments", description = "Checkout and gateway webhooks"),
        (name = "images", description = "Image upload signing"),
    )
)]
pub struct ApiDoc;

/// Registers every API route.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(handlers::accounts::configure)
        .configure(handlers::catalog::configure)
        .configure(handlers::cart::configure)
        .configure(handlers::orders::configure)
        .configure(handlers::payments::configure)
        .configure(handlers::images::configure);
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_every_route_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        for path in [
            "/auth/signup",
            "/products/{id}/like",
            "/cart/items/{product_id}",
            "/orders/mine",
            "/payment-webhook",
            "/images/signed-upload",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
