use common::{ProductId, UserId};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{Cart, Money, Order, Rating, RatingSummary, ShippingDetails};

fn filled_cart(lines: usize) -> (Cart, Vec<ProductId>) {
    let mut cart = Cart::empty(UserId::new());
    let products: Vec<ProductId> = (0..lines).map(|_| ProductId::new()).collect();
    for (i, p) in products.iter().enumerate() {
        cart.add(*p, 1, Money::from_cents(100 * (i as i64 + 1))).unwrap();
    }
    (cart, products)
}

fn bench_cart_add_existing_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain/cart_add_existing_line");
    for lines in [10usize, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            let (mut cart, products) = filled_cart(lines);
            let last = products[lines - 1];
            b.iter(|| {
                cart.add(last, 1, Money::from_cents(999)).unwrap();
                cart.set_quantity(last, 1).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_cart_restore(c: &mut Criterion) {
    let (cart, _) = filled_cart(100);
    let lines = cart.lines().to_vec();
    let owner = cart.owner();

    c.bench_function("domain/cart_restore_100_lines", |b| {
        b.iter(|| {
            Cart::restore(
                owner,
                lines.clone(),
                1,
                cart.created_at(),
                cart.updated_at(),
            )
        });
    });
}

fn bench_order_from_cart(c: &mut Criterion) {
    let (cart, _) = filled_cart(50);
    let shipping = ShippingDetails::new("10 Main St", "555 0100").unwrap();

    c.bench_function("domain/order_from_cart_50_lines", |b| {
        b.iter(|| Order::from_cart(&cart, shipping.clone()).unwrap());
    });
}

fn bench_rating_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain/rating_summary");
    for count in [10usize, 1_000, 100_000] {
        let ratings: Vec<Rating> = (0..count)
            .map(|i| Rating::new((i % 5) as i64 + 1).unwrap())
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &ratings, |b, ratings| {
            b.iter(|| RatingSummary::from_ratings(ratings.iter().copied()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cart_add_existing_line,
    bench_cart_restore,
    bench_order_from_cart,
    bench_rating_summary,
);
criterion_main!(benches);
