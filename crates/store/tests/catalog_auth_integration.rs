use chrono::Duration;
use common::CategoryId;
use domain::{
    AuthService, CatalogService, CategoryPatch, DomainError, Money, NewProduct, Pagination,
    ReviewService, Role, TokenSettings,
};
use store::InMemoryStore;

async fn seeded_catalog() -> (InMemoryStore, CatalogService<InMemoryStore>) {
    let store = InMemoryStore::new();
    let catalog = CatalogService::new(store.clone());

    let tools = catalog.create_category("Power Tools", None, None).await.unwrap();
    let garden = catalog.create_category("Garden", None, None).await.unwrap();
    let acme = catalog.create_brand("Acme", None).await.unwrap();
    let bolt = catalog.create_brand("Bolt & Co", None).await.unwrap();

    for (name, price, category, brand, is_new, is_sale) in [
        ("Cordless Drill", 8900, tools.id, acme.id, true, false),
        ("Impact Driver", 12900, tools.id, bolt.id, false, true),
        ("Angle Grinder", 5400, tools.id, acme.id, false, false),
        ("Hedge Trimmer", 7600, garden.id, bolt.id, true, true),
        ("100% Rake", 1500, garden.id, acme.id, false, false),
    ] {
        catalog
            .create_product(NewProduct {
                name: name.to_string(),
                price: Money::from_cents(price),
                category_id: category,
                brand_id: brand,
                quantity: 3,
                is_new,
                is_sale,
                ..Default::default()
            })
            .await
            .unwrap();
    }

    (store, catalog)
}

#[tokio::test]
async fn listing_pages_newest_first() {
    let (_, catalog) = seeded_catalog().await;

    let first = catalog.list_products(Pagination::new(Some(1), Some(2))).await.unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.products.len(), 2);
    assert_eq!(first.products[0].slug, "100-rake");

    let last = catalog.list_products(Pagination::new(Some(3), Some(2))).await.unwrap();
    assert_eq!(last.products.len(), 1);
    assert_eq!(last.products[0].slug, "cordless-drill");
}

#[tokio::test]
async fn flags_filters_and_slugs() {
    let (_, catalog) = seeded_catalog().await;

    assert_eq!(catalog.new_products().await.unwrap().len(), 2);
    assert_eq!(catalog.sale_products().await.unwrap().len(), 2);

    let tools = catalog.products_by_category_slug("power-tools").await.unwrap();
    assert_eq!(tools.len(), 3);
    let bolt = catalog.products_by_brand_slug("bolt-co").await.unwrap();
    assert_eq!(bolt.len(), 2);

    let cheap = catalog
        .filter(None, None, Some(Money::from_cents(1500)), Some(Money::from_cents(7600)))
        .await
        .unwrap();
    let mut names: Vec<_> = cheap.iter().map(|p| p.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["100% Rake", "Angle Grinder", "Hedge Trimmer"]);

    let missing = catalog.products_by_category_slug("kitchen").await;
    assert!(matches!(missing, Err(DomainError::NotFound { entity: "Category", .. })));
}

#[tokio::test]
async fn search_is_literal_and_case_insensitive() {
    let (_, catalog) = seeded_catalog().await;

    let found = catalog.search("DRI").await.unwrap();
    assert_eq!(found.len(), 2);

    let percent = catalog.search("%").await.unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].name, "100% Rake");

    let empty = catalog.search("   ").await;
    assert!(matches!(empty, Err(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn related_excludes_the_product_itself() {
    let (_, catalog) = seeded_catalog().await;

    let related = catalog.related("cordless-drill").await.unwrap();
    assert_eq!(related.len(), 2);
    assert!(related.iter().all(|p| p.slug != "cordless-drill"));
}

#[tokio::test]
async fn duplicate_names_conflict() {
    let (_, catalog) = seeded_catalog().await;
    let category = catalog.category_by_slug("garden").await.unwrap();
    let brand = catalog.brand_by_slug("acme").await.unwrap();

    let product = catalog
        .create_product(NewProduct {
            name: "cordless drill".to_string(),
            price: Money::from_cents(100),
            category_id: category.id,
            brand_id: brand.id,
            ..Default::default()
        })
        .await;
    assert!(matches!(product, Err(DomainError::Conflict(_))));

    let brand = catalog.create_brand("ACME", None).await;
    assert!(matches!(brand, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn create_product_requires_existing_category() {
    let (_, catalog) = seeded_catalog().await;
    let brand = catalog.brand_by_slug("acme").await.unwrap();

    let result = catalog
        .create_product(NewProduct {
            name: "Orphan".to_string(),
            price: Money::from_cents(100),
            category_id: CategoryId::new(),
            brand_id: brand.id,
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(DomainError::NotFound { entity: "Category", .. })));
}

#[tokio::test]
async fn stock_drives_availability() {
    let (_, catalog) = seeded_catalog().await;
    let drill = catalog.product_by_slug("cordless-drill").await.unwrap();
    assert!(drill.in_stock);

    let drained = catalog.update_stock(drill.id, 0).await.unwrap();
    assert!(!drained.in_stock);
    assert_eq!(drained.quantity, 0);

    let refilled = catalog.update_stock(drill.id, 4).await.unwrap();
    assert!(refilled.in_stock);

    let negative = catalog.update_stock(drill.id, -1).await;
    assert!(matches!(negative, Err(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn product_update_keeps_rating() {
    let (store, catalog) = seeded_catalog().await;
    let reviews = ReviewService::new(store.clone());
    let drill = catalog.product_by_slug("cordless-drill").await.unwrap();
    reviews
        .submit(common::UserId::new(), drill.id, 4, "solid")
        .await
        .unwrap();

    let renamed = catalog
        .update_product(
            drill.id,
            domain::ProductPatch {
                name: Some("Cordless Drill XL".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(renamed.slug, "cordless-drill-xl");
    assert_eq!(renamed.rating.count(), 1);
    assert_eq!(renamed.rating.average_tenths(), 40);
}

#[tokio::test]
async fn deleting_product_removes_its_reviews() {
    let (store, catalog) = seeded_catalog().await;
    let reviews = ReviewService::new(store.clone());
    let drill = catalog.product_by_slug("cordless-drill").await.unwrap();
    reviews
        .submit(common::UserId::new(), drill.id, 5, "")
        .await
        .unwrap();

    catalog.delete_product(drill.id).await.unwrap();

    assert!(reviews.list(drill.id).await.unwrap().is_empty());
    let again = catalog.delete_product(drill.id).await;
    assert!(matches!(again, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn category_cannot_parent_itself() {
    let (_, catalog) = seeded_catalog().await;
    let garden = catalog.category_by_slug("garden").await.unwrap();

    let result = catalog
        .update_category(
            garden.id,
            CategoryPatch {
                parent_id: Some(Some(garden.id)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(DomainError::InvalidInput(_))));
}

fn auth(store: &InMemoryStore) -> AuthService<InMemoryStore> {
    AuthService::new(store.clone(), TokenSettings::default())
}

#[tokio::test]
async fn register_then_login() {
    let store = InMemoryStore::new();
    let auth = auth(&store);

    let (user, tokens) = auth
        .register("Ann", " Ann@Example.com ", "secret1")
        .await
        .unwrap();
    assert_eq!(user.email, "ann@example.com");
    assert_eq!(user.role, Role::Customer);

    let identity = auth.authenticate(&tokens.access_token).await.unwrap();
    assert_eq!(identity.user_id, user.id);
    assert!(!identity.is_admin());

    let (again, _) = auth.login("ANN@example.com", "secret1").await.unwrap();
    assert_eq!(again.id, user.id);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let store = InMemoryStore::new();
    let auth = auth(&store);
    auth.register("Ann", "ann@example.com", "secret1").await.unwrap();

    let wrong_password = auth.login("ann@example.com", "nope123").await.unwrap_err();
    let unknown_email = auth.login("bob@example.com", "secret1").await.unwrap_err();

    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert!(matches!(wrong_password, DomainError::Unauthorized(_)));
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let store = InMemoryStore::new();
    let auth = auth(&store);
    auth.register("Ann", "ann@example.com", "secret1").await.unwrap();

    let result = auth.register("Other Ann", "ANN@example.com", "secret2").await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn short_password_rejected() {
    let store = InMemoryStore::new();
    let result = auth(&store).register("Ann", "ann@example.com", "abc").await;
    assert!(matches!(result, Err(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let store = InMemoryStore::new();
    let auth = auth(&store);
    let (_, tokens) = auth.register("Ann", "ann@example.com", "secret1").await.unwrap();

    let rotated = auth.refresh(&tokens.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, tokens.refresh_token);

    let reused = auth.refresh(&tokens.refresh_token).await;
    assert!(matches!(reused, Err(DomainError::Unauthorized(_))));

    // an access token is not a refresh token
    let wrong_kind = auth.refresh(&rotated.access_token).await;
    assert!(matches!(wrong_kind, Err(DomainError::Unauthorized(_))));
}

#[tokio::test]
async fn expired_access_token_rejected() {
    let store = InMemoryStore::new();
    let auth = AuthService::new(
        store.clone(),
        TokenSettings {
            access_ttl: Duration::seconds(-1),
            refresh_ttl: Duration::days(1),
        },
    );
    let (_, tokens) = auth.register("Ann", "ann@example.com", "secret1").await.unwrap();

    let result = auth.authenticate(&tokens.access_token).await;
    assert!(matches!(result, Err(DomainError::Unauthorized(_))));
}

#[tokio::test]
async fn logout_revokes_both_tokens() {
    let store = InMemoryStore::new();
    let auth = auth(&store);
    let (_, tokens) = auth.register("Ann", "ann@example.com", "secret1").await.unwrap();
    assert_eq!(store.session_count().await, 2);

    auth.logout(&tokens.access_token, Some(&tokens.refresh_token))
        .await
        .unwrap();

    assert_eq!(store.session_count().await, 0);
    assert!(auth.authenticate(&tokens.access_token).await.is_err());
}

#[tokio::test]
async fn ensure_admin_promotes_existing_user() {
    let store = InMemoryStore::new();
    let auth = auth(&store);
    let (user, _) = auth.register("Ann", "ann@example.com", "secret1").await.unwrap();

    let admin = auth.ensure_admin("ann@example.com", "ignored1").await.unwrap();
    assert_eq!(admin.id, user.id);
    assert_eq!(admin.role, Role::Admin);

    // password unchanged
    auth.login("ann@example.com", "secret1").await.unwrap();

    let fresh = auth.ensure_admin("root@example.com", "rootpass").await.unwrap();
    assert_eq!(fresh.role, Role::Admin);
    assert_eq!(fresh.name, "Administrator");
}
