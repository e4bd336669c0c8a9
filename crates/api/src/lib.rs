//! HTTP API server for the storefront backend.
//!
//! Provides REST endpoints for the catalog, carts, orders, reviews, product
//! lists and accounts, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::{
    AuthService, CartService, CatalogService, CompareService, FavoritesService, OrderService,
    ProfileService, ReviewService, Store, TokenSettings,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub auth: AuthService<S>,
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub reviews: ReviewService<S>,
    pub favorites: FavoritesService<S>,
    pub compare: CompareService<S>,
    pub profiles: ProfileService<S>,
}

/// Creates the application state with every service sharing one store.
pub fn create_state<S: Store>(store: S, tokens: TokenSettings) -> Arc<AppState<S>> {
    Arc::new(AppState {
        auth: AuthService::new(store.clone(), tokens),
        catalog: CatalogService::new(store.clone()),
        carts: CartService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        reviews: ReviewService::new(store.clone()),
        favorites: FavoritesService::new(store.clone()),
        compare: CompareService::new(store.clone()),
        profiles: ProfileService::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    use routes::{auth, brands, cart, categories, health, lists, orders, products, reviews, users};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/health", get(health::check))
        // Accounts
        .route("/auth/register", post(auth::register::<S>))
        .route("/auth/login", post(auth::login::<S>))
        .route("/auth/refresh", post(auth::refresh::<S>))
        .route("/auth/logout", post(auth::logout::<S>))
        .route("/users/profile", get(users::profile::<S>))
        // Catalog
        .route("/products", get(products::list::<S>))
        .route("/products/new", get(products::new_arrivals::<S>))
        .route("/products/sale", get(products::on_sale::<S>))
        .route("/products/search", get(products::search::<S>))
        .route("/products/filter", get(products::filter::<S>))
        .route("/products/category/{slug}", get(products::by_category::<S>))
        .route("/products/brand/{slug}", get(products::by_brand::<S>))
        .route("/products/{slug}", get(products::get::<S>))
        .route("/products/{slug}/related", get(products::related::<S>))
        .route("/admin/products", post(products::create::<S>))
        .route(
            "/admin/products/{id}",
            patch(products::update::<S>).delete(products::delete::<S>),
        )
        .route("/admin/products/{id}/stock", patch(products::update_stock::<S>))
        .route(
            "/categories",
            get(categories::list::<S>).post(categories::create::<S>),
        )
        .route(
            "/categories/{key}",
            get(categories::get::<S>)
                .patch(categories::update::<S>)
                .delete(categories::delete::<S>),
        )
        .route("/brands", get(brands::list::<S>).post(brands::create::<S>))
        .route(
            "/brands/{key}",
            get(brands::get::<S>)
                .patch(brands::update::<S>)
                .delete(brands::delete::<S>),
        )
        // Cart and lists
        .route("/cart", get(cart::get::<S>).patch(cart::change::<S>))
        .route("/cart/add", post(cart::add::<S>))
        .route("/cart/change", post(cart::change::<S>))
        .route("/cart/remove", post(cart::remove::<S>))
        .route("/cart/clear", post(cart::clear::<S>))
        .route("/favorites", get(lists::favorites::<S>))
        .route("/favorites/toggle", post(lists::toggle_favorite::<S>))
        .route("/favorites/remove", post(lists::remove_favorite::<S>))
        .route("/compare", get(lists::compare::<S>))
        .route("/compare/add", post(lists::add_compare::<S>))
        .route("/compare/remove", post(lists::remove_compare::<S>))
        .route("/compare/clear", post(lists::clear_compare::<S>))
        // Orders
        .route("/orders", post(orders::place::<S>).get(orders::list_all::<S>))
        .route("/orders/my", get(orders::list_mine::<S>))
        .route("/orders/{id}/status", patch(orders::set_status::<S>))
        // Reviews
        .route("/reviews", post(reviews::submit::<S>))
        .route(
            "/reviews/{id}",
            get(reviews::list::<S>).delete(reviews::remove::<S>),
        )
        .route("/reviews/admin/{id}", axum::routing::delete(reviews::remove_any::<S>))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
