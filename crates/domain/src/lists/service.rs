use common::{ProductId, UserId};

use crate::catalog::Product;
use crate::error::DomainError;
use crate::ports::Store;

use super::{COMPARE_LIMIT, ListKind, ProductList};

/// Loads a list, falling back to a fresh empty one.
async fn load_or_empty<S: Store>(
    store: &S,
    owner: UserId,
    kind: ListKind,
) -> Result<ProductList, DomainError> {
    Ok(store
        .find_list(owner, kind)
        .await?
        .unwrap_or_else(|| ProductList::empty(owner, kind)))
}

async fn ensure_product<S: Store>(store: &S, product_id: ProductId) -> Result<(), DomainError> {
    match store.find_product(product_id).await? {
        Some(_) => Ok(()),
        None => Err(DomainError::not_found("Product", product_id)),
    }
}

/// Resolves the products of a list in list order, skipping deleted ones.
async fn resolve<S: Store>(store: &S, list: &ProductList) -> Result<Vec<Product>, DomainError> {
    let mut products = Vec::with_capacity(list.len());
    for id in &list.products {
        if let Some(product) = store.find_product(*id).await? {
            products.push(product);
        }
    }
    Ok(products)
}

/// Service for a user's favorite products.
#[derive(Clone)]
pub struct FavoritesService<S: Store> {
    store: S,
}

impl<S: Store> FavoritesService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the owner's favorites, creating the list on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, owner: UserId) -> Result<ProductList, DomainError> {
        if let Some(list) = self.store.find_list(owner, ListKind::Favorites).await? {
            return Ok(list);
        }
        let list = ProductList::empty(owner, ListKind::Favorites);
        self.store.save_list(&list).await?;
        Ok(list)
    }

    /// Adds the product if absent, removes it otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn toggle(
        &self,
        owner: UserId,
        product_id: ProductId,
    ) -> Result<ProductList, DomainError> {
        ensure_product(&self.store, product_id).await?;

        let mut list = load_or_empty(&self.store, owner, ListKind::Favorites).await?;
        let listed = list.toggle(product_id);
        self.store.save_list(&list).await?;

        tracing::debug!(product_id = %product_id, listed, "favorite toggled");
        Ok(list)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(
        &self,
        owner: UserId,
        product_id: ProductId,
    ) -> Result<ProductList, DomainError> {
        let mut list = self
            .store
            .find_list(owner, ListKind::Favorites)
            .await?
            .ok_or_else(|| DomainError::not_found("Favorites", owner))?;

        if list.remove(product_id) {
            self.store.save_list(&list).await?;
        }
        Ok(list)
    }

    /// The listed products, in list order.
    pub async fn products(&self, list: &ProductList) -> Result<Vec<Product>, DomainError> {
        resolve(&self.store, list).await
    }
}

/// Service for a user's comparison list, bounded to [`COMPARE_LIMIT`] entries.
#[derive(Clone)]
pub struct CompareService<S: Store> {
    store: S,
}

impl<S: Store> CompareService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, owner: UserId) -> Result<ProductList, DomainError> {
        if let Some(list) = self.store.find_list(owner, ListKind::Compare).await? {
            return Ok(list);
        }
        let list = ProductList::empty(owner, ListKind::Compare);
        self.store.save_list(&list).await?;
        Ok(list)
    }

    /// Adds a product. An already listed product is left as is.
    #[tracing::instrument(skip(self))]
    pub async fn add(
        &self,
        owner: UserId,
        product_id: ProductId,
    ) -> Result<ProductList, DomainError> {
        ensure_product(&self.store, product_id).await?;

        let mut list = load_or_empty(&self.store, owner, ListKind::Compare).await?;
        if list.contains(product_id) {
            return Ok(list);
        }
        if list.len() >= COMPARE_LIMIT {
            return Err(DomainError::invalid(format!(
                "You can compare only {COMPARE_LIMIT} products at once"
            )));
        }

        list.insert(product_id);
        self.store.save_list(&list).await?;
        Ok(list)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(
        &self,
        owner: UserId,
        product_id: ProductId,
    ) -> Result<ProductList, DomainError> {
        let mut list = self
            .store
            .find_list(owner, ListKind::Compare)
            .await?
            .ok_or_else(|| DomainError::not_found("Compare list", owner))?;

        if list.remove(product_id) {
            self.store.save_list(&list).await?;
        }
        Ok(list)
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, owner: UserId) -> Result<ProductList, DomainError> {
        let mut list = load_or_empty(&self.store, owner, ListKind::Compare).await?;
        list.clear();
        self.store.save_list(&list).await?;
        Ok(list)
    }

    /// The listed products, in list order.
    pub async fn products(&self, list: &ProductList) -> Result<Vec<Product>, DomainError> {
        resolve(&self.store, list).await
    }
}
