//! In-memory port implementations for service tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::auth::{Principal, Role};
use crate::domain::cart::{CartLine, CartView};
use crate::domain::catalog::{CategoryView, NewProduct, ProductPatch, ProductQuery, ProductView};
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderDetailView, OrderLineInput, OrderStatus, OrderView};
use crate::domain::payment::{
    GatewayIntent, NewPayment, PaymentIntentStatus, PaymentIntentView, PaymentMetadata,
    PaymentView,
};
use crate::domain::ports::{
    CartRepository, CatalogRepository, CategoryRepository, Mailer, OrderRepository,
    PasswordHasher, PaymentGateway, PaymentRepository, TokenIssuer, UserRepository,
};
use crate::domain::user::{NewUser, UserRecord};

pub fn principal(role: Role) -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        email: format!("{role}@example.com"),
        role,
    }
}

struct StoredCart {
    id: Uuid,
    created_at: DateTime<Utc>,
    items: Vec<(Uuid, i32)>,
}

#[derive(Default)]
struct State {
    products: HashMap<Uuid, ProductView>,
    categories: BTreeMap<i32, CategoryView>,
    next_category_id: i32,
    likes: HashSet<(Uuid, Uuid)>,
    carts: HashMap<Uuid, StoredCart>,
    orders: Vec<OrderView>,
    payments: Vec<PaymentView>,
    users: Vec<UserRecord>,
    drain_on_place: Option<(Uuid, i32)>,
    fail_cart_clear: bool,
    fail_next_cancel: bool,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store lock poisoned")
    }

    pub fn add_product(&self, name: &str, price: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.state().products.insert(
            id,
            ProductView {
                id,
                name: name.to_string(),
                description: None,
                price: BigDecimal::from_str(price).expect("valid decimal"),
                stock,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                images: vec![],
                categories: vec![],
                liked: None,
            },
        );
        id
    }

    pub fn set_active(&self, id: Uuid, active: bool) {
        if let Some(p) = self.state().products.get_mut(&id) {
            p.is_active = active;
        }
    }

    pub fn set_price(&self, id: Uuid, price: &str) {
        if let Some(p) = self.state().products.get_mut(&id) {
            p.price = BigDecimal::from_str(price).expect("valid decimal");
        }
    }

    pub fn stock_of(&self, id: Uuid) -> i32 {
        self.state().products[&id].stock
    }

    pub fn add_client(&self) -> Principal {
        let user = UserRepository::create(
            self,
            NewUser {
                email: format!("{}@example.com", Uuid::new_v4()),
                password_hash: "plain:password".to_string(),
                first_name: "Test".to_string(),
                last_name: "Client".to_string(),
                phone: "555-0100".to_string(),
                role: Role::Client,
            },
        )
        .expect("user created");
        user.principal()
    }

    pub fn user_count(&self) -> usize {
        self.state().users.len()
    }

    pub fn put_in_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) {
        self.set_quantity(user_id, product_id, quantity)
            .expect("cart updated");
    }

    pub fn cart_items(&self, user_id: Uuid) -> Vec<(Uuid, i32)> {
        self.state()
            .carts
            .get(&user_id)
            .map(|c| c.items.clone())
            .unwrap_or_default()
    }

    /// Simulates a concurrent purchase that leaves `remaining` units of the
    /// product between the stock check and the order transaction.
    pub fn drain_stock_on_place(&self, product_id: Uuid, remaining: i32) {
        self.state().drain_on_place = Some((product_id, remaining));
    }

    pub fn fail_cart_clear(&self) {
        self.state().fail_cart_clear = true;
    }

    /// The next `cancel_and_restock` errors as a rolled-back transaction would,
    /// changing nothing.
    pub fn fail_next_cancel(&self) {
        self.state().fail_next_cancel = true;
    }

    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    pub fn only_order_id(&self) -> Uuid {
        let state = self.state();
        assert_eq!(state.orders.len(), 1, "expected exactly one order");
        state.orders[0].id
    }

    pub fn order_status(&self, id: Uuid) -> OrderStatus {
        self.state()
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.status)
            .expect("order exists")
    }

    pub fn payment_for(&self, order_id: Uuid) -> Option<PaymentView> {
        self.state()
            .payments
            .iter()
            .find(|p| p.order_id == order_id)
            .cloned()
    }

    pub fn intent_status(&self, gateway_ref: &str) -> Option<PaymentIntentStatus> {
        self.state()
            .payments
            .iter()
            .flat_map(|p| p.intents.iter())
            .find(|i| i.gateway_ref == gateway_ref)
            .map(|i| i.status)
    }

    fn with_payment(state: &State, order: &OrderView) -> OrderView {
        let mut order = order.clone();
        order.payment = state
            .payments
            .iter()
            .find(|p| p.order_id == order.id)
            .cloned();
        order
    }
}

fn with_liked(state: &State, product: &ProductView, viewer: Option<Uuid>) -> ProductView {
    let mut product = product.clone();
    product.liked = viewer.map(|user| state.likes.contains(&(user, product.id)));
    product
}

impl CatalogRepository for InMemoryStore {
    fn list(&self, query: &ProductQuery) -> Result<Vec<ProductView>, DomainError> {
        let state = self.state();
        let mut matching: Vec<&ProductView> = state
            .products
            .values()
            .filter(|p| !query.active_only || p.is_active)
            .filter(|p| {
                query.name_contains.as_ref().map_or(true, |needle| {
                    p.name.to_lowercase().contains(&needle.to_lowercase())
                })
            })
            .filter(|p| {
                query
                    .category
                    .as_ref()
                    .map_or(true, |c| p.categories.iter().any(|pc| &pc.name == c))
            })
            .filter(|p| {
                query
                    .liked_by
                    .map_or(true, |user| state.likes.contains(&(user, p.id)))
            })
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|p| with_liked(&state, p, query.viewer))
            .collect())
    }

    fn find_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<ProductView>, DomainError> {
        let state = self.state();
        Ok(state.products.get(&id).map(|p| with_liked(&state, p, viewer)))
    }

    fn create(&self, product: NewProduct) -> Result<ProductView, DomainError> {
        let mut state = self.state();
        let categories = product
            .category_ids
            .iter()
            .map(|id| {
                state
                    .categories
                    .get(id)
                    .cloned()
                    .ok_or_else(|| DomainError::invalid("Foreign key constraint failed."))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let view = ProductView {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            is_active: product.is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            images: vec![],
            categories,
            liked: None,
        };
        state.products.insert(view.id, view.clone());
        Ok(view)
    }

    fn update(&self, id: Uuid, patch: ProductPatch) -> Result<ProductView, DomainError> {
        let mut state = self.state();
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Record"))?;
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = Some(description);
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(active) = patch.is_active {
            product.is_active = active;
        }
        Ok(product.clone())
    }

    fn delete(&self, id: Uuid) -> Result<ProductView, DomainError> {
        self.state()
            .products
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("Record"))
    }

    fn attach_image(&self, product_id: Uuid, url: String) -> Result<ProductView, DomainError> {
        let mut state = self.state();
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or_else(|| DomainError::not_found("Record"))?;
        product.images.push(crate::domain::catalog::ImageView {
            id: Uuid::new_v4(),
            url,
        });
        Ok(product.clone())
    }

    fn toggle_like(&self, product_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        if state.likes.remove(&(user_id, product_id)) {
            Ok(false)
        } else {
            state.likes.insert((user_id, product_id));
            Ok(true)
        }
    }
}

impl CategoryRepository for InMemoryStore {
    fn list(&self) -> Result<Vec<CategoryView>, DomainError> {
        Ok(self.state().categories.values().cloned().collect())
    }

    fn find_by_id(&self, id: i32) -> Result<Option<CategoryView>, DomainError> {
        Ok(self.state().categories.get(&id).cloned())
    }

    fn create(&self, name: String) -> Result<CategoryView, DomainError> {
        let mut state = self.state();
        if state.categories.values().any(|c| c.name == name) {
            return Err(DomainError::Conflict("Unique constraint failed".to_string()));
        }
        state.next_category_id += 1;
        let category = CategoryView {
            id: state.next_category_id,
            name,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    fn rename(&self, id: i32, name: String) -> Result<CategoryView, DomainError> {
        let mut state = self.state();
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Record"))?;
        category.name = name;
        Ok(category.clone())
    }

    fn delete(&self, id: i32) -> Result<CategoryView, DomainError> {
        self.state()
            .categories
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("Record"))
    }
}

impl CartRepository for InMemoryStore {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let state = self.state();
        Ok(state.carts.get(&user_id).map(|cart| CartView {
            id: cart.id,
            user_id,
            created_at: cart.created_at,
            items: cart
                .items
                .iter()
                .filter_map(|(product_id, quantity)| {
                    state.products.get(product_id).map(|p| CartLine {
                        product: p.clone(),
                        quantity: *quantity,
                    })
                })
                .collect(),
        }))
    }

    fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let mut state = self.state();
        let cart = state.carts.entry(user_id).or_insert_with(|| StoredCart {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            items: vec![],
        });
        match cart.items.iter_mut().find(|(p, _)| *p == product_id) {
            Some(item) => item.1 = quantity,
            None => cart.items.push((product_id, quantity)),
        }
        Ok(())
    }

    fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        let Some(cart) = state.carts.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = cart.items.len();
        cart.items.retain(|(p, _)| *p != product_id);
        Ok(cart.items.len() != before)
    }

    fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.fail_cart_clear {
            return Err(DomainError::Internal("connection reset".to_string()));
        }
        if let Some(cart) = state.carts.get_mut(&user_id) {
            cart.items.clear();
        }
        Ok(())
    }
}

impl OrderRepository for InMemoryStore {
    fn place(&self, customer_id: Uuid, lines: &[OrderLineInput]) -> Result<OrderView, DomainError> {
        let mut state = self.state();
        if let Some((product_id, remaining)) = state.drain_on_place.take() {
            if let Some(p) = state.products.get_mut(&product_id) {
                p.stock = remaining;
            }
        }

        // Work on a copy so a failed line leaves no partial decrement behind.
        let mut products = state.products.clone();
        let mut details = Vec::with_capacity(lines.len());
        for line in lines {
            let product = products
                .get_mut(&line.product_id)
                .filter(|p| p.stock >= line.quantity)
                .ok_or(DomainError::InsufficientStock {
                    product_id: line.product_id,
                })?;
            product.stock -= line.quantity;
            details.push(OrderDetailView {
                product_id: line.product_id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price.clone(),
            });
        }
        state.products = products;

        let now = Utc::now();
        let order = OrderView {
            id: Uuid::new_v4(),
            customer_id,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            details,
            payment: None,
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let state = self.state();
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| Self::with_payment(&state, o)))
    }

    fn list(&self, customer_id: Option<Uuid>) -> Result<Vec<OrderView>, DomainError> {
        let state = self.state();
        Ok(state
            .orders
            .iter()
            .filter(|o| customer_id.map_or(true, |c| o.customer_id == c))
            .map(|o| Self::with_payment(&state, o))
            .collect())
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        let mut state = self.state();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| DomainError::not_found("Record to update"))?;
        order.status = status;
        order.updated_at = Utc::now();
        let order = order.clone();
        Ok(Self::with_payment(&state, &order))
    }

    fn restock(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state();
        let details: Vec<(Uuid, i32)> = state
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.details.iter().map(|d| (d.product_id, d.quantity)).collect())
            .unwrap_or_default();
        for (product_id, quantity) in details {
            if let Some(p) = state.products.get_mut(&product_id) {
                p.stock += quantity;
            }
        }
        Ok(())
    }

    fn cancel_and_restock(&self, id: Uuid) -> Result<Option<OrderStatus>, DomainError> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next_cancel) {
            return Err(DomainError::Internal("connection reset".to_string()));
        }
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| DomainError::not_found("Order"))?;
        let previous = order.status;
        if previous == OrderStatus::Cancelled {
            return Ok(None);
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        let details: Vec<(Uuid, i32)> = order
            .details
            .iter()
            .map(|d| (d.product_id, d.quantity))
            .collect();
        for (product_id, quantity) in details {
            if let Some(p) = state.products.get_mut(&product_id) {
                p.stock += quantity;
            }
        }
        Ok(Some(previous))
    }
}

impl PaymentRepository for InMemoryStore {
    fn create(&self, payment: NewPayment) -> Result<PaymentView, DomainError> {
        let now = Utc::now();
        let view = PaymentView {
            id: Uuid::new_v4(),
            order_id: payment.order_id,
            amount_in_cents: payment.amount_in_cents,
            currency: payment.currency,
            created_at: now,
            updated_at: now,
            intents: vec![PaymentIntentView {
                id: Uuid::new_v4(),
                gateway_ref: payment.gateway_ref,
                status: PaymentIntentStatus::Pending,
                status_info: None,
                created_at: now,
                updated_at: now,
            }],
        };
        self.state().payments.push(view.clone());
        Ok(view)
    }

    fn set_intent_status(
        &self,
        gateway_ref: &str,
        status: PaymentIntentStatus,
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        let intent = state
            .payments
            .iter_mut()
            .flat_map(|p| p.intents.iter_mut())
            .find(|i| i.gateway_ref == gateway_ref)
            .ok_or_else(|| DomainError::not_found("Record to update"))?;
        intent.status = status;
        intent.updated_at = Utc::now();
        Ok(())
    }
}

impl UserRepository for InMemoryStore {
    fn create(&self, user: NewUser) -> Result<UserRecord, DomainError> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(DomainError::Conflict("Unique constraint failed".to_string()));
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            cart_id: Some(Uuid::new_v4()),
            created_at: Utc::now(),
        };
        state.carts.insert(
            record.id,
            StoredCart {
                id: record.cart_id.unwrap_or_default(),
                created_at: record.created_at,
                items: vec![],
            },
        );
        state.users.push(record.clone());
        Ok(record)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError> {
        Ok(self.state().users.iter().find(|u| u.email == email).cloned())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DomainError> {
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }

    fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), DomainError> {
        let mut state = self.state();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DomainError::not_found("Record to update"))?;
        user.password_hash = password_hash;
        Ok(())
    }
}

/// Records every intent request and can be told to fail the next one.
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<(i64, String, PaymentMetadata)>>,
    fail_next: Mutex<bool>,
}

impl FakeGateway {
    pub fn fail_next(&self) {
        *self.fail_next.lock().expect("lock") = true;
    }

    pub fn calls(&self) -> Vec<(i64, String, PaymentMetadata)> {
        self.calls.lock().expect("lock").clone()
    }
}

impl PaymentGateway for FakeGateway {
    fn create_payment_intent(
        &self,
        amount_in_cents: i64,
        currency: &str,
        metadata: &PaymentMetadata,
    ) -> Result<GatewayIntent, DomainError> {
        if std::mem::take(&mut *self.fail_next.lock().expect("lock")) {
            return Err(DomainError::Gateway("card network unavailable".to_string()));
        }
        let mut calls = self.calls.lock().expect("lock");
        calls.push((amount_in_cents, currency.to_string(), metadata.clone()));
        let id = format!("pi_{}", calls.len());
        Ok(GatewayIntent {
            client_secret: format!("{id}_secret"),
            id,
        })
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("lock").clone()
    }
}

impl Mailer for RecordingMailer {
    fn send_password_reset(&self, recipient: &str, reset_url: &str) -> Result<(), DomainError> {
        self.sent
            .lock()
            .expect("lock")
            .push((recipient.to_string(), reset_url.to_string()));
        Ok(())
    }
}

pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, secret: &str) -> Result<String, DomainError> {
        Ok(format!("plain:{secret}"))
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool, DomainError> {
        Ok(hash == format!("plain:{secret}"))
    }
}

/// Tokens of the form `access:<user id>:<role>` and `reset:<user id>`.
pub struct FakeTokens;

impl TokenIssuer for FakeTokens {
    fn issue_access(&self, principal: &Principal) -> Result<String, DomainError> {
        Ok(format!("access:{}:{}", principal.user_id, principal.role))
    }

    fn verify_access(&self, token: &str) -> Result<Principal, DomainError> {
        let invalid = || DomainError::Unauthorized("Invalid token".to_string());
        let rest = token.strip_prefix("access:").ok_or_else(invalid)?;
        let (id, role) = rest.split_once(':').ok_or_else(invalid)?;
        Ok(Principal {
            user_id: Uuid::parse_str(id).map_err(|_| invalid())?,
            email: String::new(),
            role: role.parse().map_err(|_| invalid())?,
        })
    }

    fn issue_reset(&self, principal: &Principal) -> Result<String, DomainError> {
        Ok(format!("reset:{}", principal.user_id))
    }

    fn verify_reset(&self, token: &str) -> Result<Principal, DomainError> {
        let invalid = || DomainError::Unauthorized("Invalid token".to_string());
        let id = token.strip_prefix("reset:").ok_or_else(invalid)?;
        Ok(Principal {
            user_id: Uuid::parse_str(id).map_err(|_| invalid())?,
            email: String::new(),
            role: Role::Client,
        })
    }
}
