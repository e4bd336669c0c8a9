use std::collections::BTreeMap;

use chrono::Utc;
use common::{BrandId, CategoryId, ProductId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    CartService, CatalogRepository, Money, OrderService, Product, RatingSummary, ReviewService,
};
use store::InMemoryStore;

fn product(slug: &str) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::new(),
        name: slug.to_string(),
        slug: slug.to_string(),
        description: String::new(),
        price: Money::from_cents(1999),
        old_price: None,
        category_id: CategoryId::new(),
        brand_id: BrandId::new(),
        images: Vec::new(),
        characteristics: BTreeMap::new(),
        in_stock: true,
        quantity: 100,
        is_new: false,
        is_sale: false,
        rating: RatingSummary::default(),
        created_at: now,
        updated_at: now,
    }
}

fn seeded(rt: &tokio::runtime::Runtime, count: usize) -> (InMemoryStore, Vec<ProductId>) {
    let store = InMemoryStore::new();
    let ids = rt.block_on(async {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let p = product(&format!("bench-{i}"));
            store.insert_product(&p).await.unwrap();
            ids.push(p.id);
        }
        ids
    });
    (store, ids)
}

fn bench_cart_add_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, ids) = seeded(&rt, 20);
    let carts = CartService::new(store);
    let owner = UserId::new();

    c.bench_function("store/cart_add_item", |b| {
        let mut i = 0;
        b.iter(|| {
            rt.block_on(async {
                carts.add_item(owner, ids[i % ids.len()], 1).await.unwrap();
            });
            i += 1;
        });
    });
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, ids) = seeded(&rt, 5);
    let carts = CartService::new(store.clone());
    let orders = OrderService::new(store);

    c.bench_function("store/fill_cart_and_place_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                let owner = UserId::new();
                for id in &ids {
                    carts.add_item(owner, *id, 2).await.unwrap();
                }
                orders.place_order(owner, "1 Bench Rd", "555").await.unwrap();
            });
        });
    });
}

fn bench_review_recompute(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, ids) = seeded(&rt, 1);
    let reviews = ReviewService::new(store);
    let product_id = ids[0];

    rt.block_on(async {
        for i in 0..500 {
            reviews
                .submit(UserId::new(), product_id, (i % 5) + 1, "seed")
                .await
                .unwrap();
        }
    });

    c.bench_function("store/review_submit_500_existing", |b| {
        let author = UserId::new();
        b.iter(|| {
            rt.block_on(async {
                reviews.submit(author, product_id, 4, "again").await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_cart_add_item,
    bench_place_order,
    bench_review_recompute,
);
criterion_main!(benches);
