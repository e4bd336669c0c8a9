//! Catalog service: product browsing and catalog administration.

use std::collections::HashMap;

use chrono::Utc;
use common::{BrandId, CategoryId, ProductId};

use crate::error::DomainError;
use crate::money::Money;
use crate::ports::Store;
use crate::review::RatingSummary;

use super::{
    Brand, BrandPatch, Category, CategoryPatch, NewProduct, Pagination, Product, ProductPage,
    ProductPatch, ProductQuery, slugify,
};

/// Maximum number of related products returned.
pub const RELATED_LIMIT: usize = 10;

/// Service for reading and administering the catalog.
#[derive(Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // Product reads

    /// One page of the catalog, newest first, with the total product count.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, page: Pagination) -> Result<ProductPage, DomainError> {
        let query = ProductQuery::new().limit(page.limit).offset(page.offset());
        Ok(self.store.query_products(query).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn product_by_slug(&self, slug: &str) -> Result<Product, DomainError> {
        self.store
            .find_product_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", slug))
    }

    #[tracing::instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product, DomainError> {
        self.store
            .find_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    /// Looks up several products at once, keyed by id.
    ///
    /// Unknown or deleted products are simply absent from the map.
    #[tracing::instrument(skip_all)]
    pub async fn products_by_ids(
        &self,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> Result<HashMap<ProductId, Product>, DomainError> {
        let mut found = HashMap::new();
        for id in ids {
            if found.contains_key(&id) {
                continue;
            }
            if let Some(product) = self.store.find_product(id).await? {
                found.insert(id, product);
            }
        }
        Ok(found)
    }

    /// Products flagged as new.
    #[tracing::instrument(skip(self))]
    pub async fn new_products(&self) -> Result<Vec<Product>, DomainError> {
        self.products(ProductQuery::new().only_new()).await
    }

    /// Products flagged as on sale.
    #[tracing::instrument(skip(self))]
    pub async fn sale_products(&self) -> Result<Vec<Product>, DomainError> {
        self.products(ProductQuery::new().only_sale()).await
    }

    /// Case-insensitive literal substring search on product names.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<Product>, DomainError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(DomainError::invalid("Search query is required"));
        }
        self.products(ProductQuery::new().name_contains(term)).await
    }

    /// Products matching every supplied filter.
    #[tracing::instrument(skip(self))]
    pub async fn filter(
        &self,
        category: Option<CategoryId>,
        brand: Option<BrandId>,
        min_price: Option<Money>,
        max_price: Option<Money>,
    ) -> Result<Vec<Product>, DomainError> {
        let mut query = ProductQuery::new();
        query.category_id = category;
        query.brand_id = brand;
        query.min_price = min_price;
        query.max_price = max_price;
        self.products(query).await
    }

    /// Up to ten other products of the same category.
    #[tracing::instrument(skip(self))]
    pub async fn related(&self, slug: &str) -> Result<Vec<Product>, DomainError> {
        let product = self.product_by_slug(slug).await?;
        let query = ProductQuery::new()
            .category(product.category_id)
            .exclude(product.id)
            .limit(RELATED_LIMIT);
        self.products(query).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn products_by_category_slug(&self, slug: &str) -> Result<Vec<Product>, DomainError> {
        let category = self.category_by_slug(slug).await?;
        self.products(ProductQuery::new().category(category.id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn products_by_brand_slug(&self, slug: &str) -> Result<Vec<Product>, DomainError> {
        let brand = self.brand_by_slug(slug).await?;
        self.products(ProductQuery::new().brand(brand.id)).await
    }

    async fn products(&self, query: ProductQuery) -> Result<Vec<Product>, DomainError> {
        Ok(self.store.query_products(query).await?.products)
    }

    // Product administration

    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_product(&self, new: NewProduct) -> Result<Product, DomainError> {
        let name = new.name.trim().to_string();
        let slug = slug_for(&name)?;
        validate_price(new.price)?;
        if let Some(old) = new.old_price {
            validate_price(old)?;
        }
        self.ensure_category(new.category_id).await?;
        self.ensure_brand(new.brand_id).await?;

        let now = Utc::now();
        let mut product = Product {
            id: ProductId::new(),
            name,
            slug,
            description: new.description,
            price: new.price,
            old_price: new.old_price,
            category_id: new.category_id,
            brand_id: new.brand_id,
            images: new.images,
            characteristics: new.characteristics,
            in_stock: false,
            quantity: 0,
            is_new: new.is_new,
            is_sale: new.is_sale,
            rating: RatingSummary::default(),
            created_at: now,
            updated_at: now,
        };
        product.set_stock(new.quantity);

        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    /// Applies a partial update; a new name also regenerates the slug.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, DomainError> {
        let mut product = self.product(id).await?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            product.slug = slug_for(&name)?;
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
            product.price = price;
        }
        if let Some(old_price) = patch.old_price {
            if let Some(old) = old_price {
                validate_price(old)?;
            }
            product.old_price = old_price;
        }
        if let Some(category_id) = patch.category_id {
            self.ensure_category(category_id).await?;
            product.category_id = category_id;
        }
        if let Some(brand_id) = patch.brand_id {
            self.ensure_brand(brand_id).await?;
            product.brand_id = brand_id;
        }
        if let Some(images) = patch.images {
            product.images = images;
        }
        if let Some(characteristics) = patch.characteristics {
            product.characteristics = characteristics;
        }
        if let Some(quantity) = patch.quantity {
            product.set_stock(quantity);
        }
        if let Some(is_new) = patch.is_new {
            product.is_new = is_new;
        }
        if let Some(is_sale) = patch.is_sale {
            product.is_sale = is_sale;
        }
        product.updated_at = Utc::now();

        self.store
            .update_product(&product)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), DomainError> {
        if !self.store.delete_product(id).await? {
            return Err(DomainError::not_found("Product", id));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Sets the stock level; availability follows the quantity.
    #[tracing::instrument(skip(self))]
    pub async fn update_stock(&self, id: ProductId, quantity: i64) -> Result<Product, DomainError> {
        let quantity = u32::try_from(quantity)
            .map_err(|_| DomainError::invalid("Quantity must be a non-negative integer"))?;
        self.store
            .set_product_stock(id, quantity)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    async fn ensure_category(&self, id: CategoryId) -> Result<(), DomainError> {
        match self.store.find_category(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("Category", id)),
        }
    }

    async fn ensure_brand(&self, id: BrandId) -> Result<(), DomainError> {
        match self.store.find_brand(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("Brand", id)),
        }
    }

    // Categories

    #[tracing::instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: &str,
        parent_id: Option<CategoryId>,
        image: Option<String>,
    ) -> Result<Category, DomainError> {
        let name = name.trim().to_string();
        let slug = slug_for(&name)?;
        if let Some(parent) = parent_id {
            self.ensure_category(parent).await?;
        }

        let category = Category {
            id: CategoryId::new(),
            name,
            slug,
            parent_id,
            image,
            created_at: Utc::now(),
        };
        self.store.insert_category(&category).await?;
        Ok(category)
    }

    /// All categories, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, DomainError> {
        Ok(self.store.list_categories().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn category_by_slug(&self, slug: &str) -> Result<Category, DomainError> {
        self.store
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", slug))
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, DomainError> {
        let mut category = self
            .store
            .find_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            category.slug = slug_for(&name)?;
            category.name = name;
        }
        if let Some(parent_id) = patch.parent_id {
            if let Some(parent) = parent_id {
                if parent == id {
                    return Err(DomainError::invalid("A category cannot be its own parent"));
                }
                self.ensure_category(parent).await?;
            }
            category.parent_id = parent_id;
        }
        if let Some(image) = patch.image {
            category.image = image;
        }

        self.store
            .update_category(&category)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), DomainError> {
        if !self.store.delete_category(id).await? {
            return Err(DomainError::not_found("Category", id));
        }
        Ok(())
    }

    // Brands

    #[tracing::instrument(skip(self))]
    pub async fn create_brand(
        &self,
        name: &str,
        image: Option<String>,
    ) -> Result<Brand, DomainError> {
        let name = name.trim().to_string();
        let slug = slug_for(&name)?;

        let brand = Brand {
            id: BrandId::new(),
            name,
            slug,
            image,
            created_at: Utc::now(),
        };
        self.store.insert_brand(&brand).await?;
        Ok(brand)
    }

    /// All brands, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn brands(&self) -> Result<Vec<Brand>, DomainError> {
        Ok(self.store.list_brands().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn brand_by_slug(&self, slug: &str) -> Result<Brand, DomainError> {
        self.store
            .find_brand_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Brand", slug))
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_brand(&self, id: BrandId, patch: BrandPatch) -> Result<Brand, DomainError> {
        let mut brand = self
            .store
            .find_brand(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Brand", id))?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            brand.slug = slug_for(&name)?;
            brand.name = name;
        }
        if let Some(image) = patch.image {
            brand.image = image;
        }

        self.store
            .update_brand(&brand)
            .await?
            .ok_or_else(|| DomainError::not_found("Brand", id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_brand(&self, id: BrandId) -> Result<(), DomainError> {
        if !self.store.delete_brand(id).await? {
            return Err(DomainError::not_found("Brand", id));
        }
        Ok(())
    }
}

fn slug_for(name: &str) -> Result<String, DomainError> {
    slugify(name).ok_or_else(|| DomainError::invalid("Name must contain letters or digits"))
}

fn validate_price(price: Money) -> Result<(), DomainError> {
    if price.is_negative() {
        return Err(DomainError::invalid("Price cannot be negative"));
    }
    Ok(())
}
