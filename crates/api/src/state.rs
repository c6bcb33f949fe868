//! Application state shared across handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use souk_core::Product;

use crate::config::ApiConfig;
use crate::db::{ProductRepository, RepositoryError};
use crate::services::assets::{AssetError, CloudinaryClient};
use crate::services::auth::{AuthService, TokenService};
use crate::services::lockout::LockoutService;

/// How long the product list stays cached.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    assets: CloudinaryClient,
    tokens: TokenService,
    lockout: LockoutService,
    products: ProductCache,
}

/// Cached product list. A load overtaken by an invalidation is not kept.
struct ProductCache {
    entries: Cache<(), Arc<Vec<Product>>>,
    generation: AtomicU64,
}

impl ProductCache {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            generation: AtomicU64::new(0),
        }
    }

    async fn get_or_load<E>(
        &self,
        load: impl Future<Output = Result<Vec<Product>, E>>,
    ) -> Result<Arc<Vec<Product>>, E> {
        if let Some(products) = self.entries.get(&()).await {
            return Ok(products);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let products = Arc::new(load.await?);
        self.entries.insert((), Arc::clone(&products)).await;

        // Invalidated while loading: drop what was just inserted
        if self.generation.load(Ordering::SeqCst) != generation {
            self.entries.invalidate(&()).await;
        }
        Ok(products)
    }

    async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate(&()).await;
    }
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset host client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, AssetError> {
        let assets = CloudinaryClient::new(&config.cloudinary)?;
        let tokens = TokenService::new(config.jwt_secret.clone());
        let lockout = LockoutService::new(pool.clone(), config.lockout);
        let products = ProductCache::new(PRODUCT_CACHE_TTL);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                assets,
                tokens,
                lockout,
                products,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn assets(&self) -> &CloudinaryClient {
        &self.inner.assets
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn lockout(&self) -> &LockoutService {
        &self.inner.lockout
    }

    /// Authentication service bound to this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.pool, &self.inner.tokens, &self.inner.lockout)
    }

    /// All products, newest first, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, RepositoryError> {
        let repo = ProductRepository::new(&self.inner.pool);
        self.inner.products.get_or_load(repo.list()).await
    }

    /// Drop the cached product list after a product mutation.
    pub async fn invalidate_products(&self) {
        self.inner.products.invalidate().await;
    }
}
