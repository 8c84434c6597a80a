//! Deterministic startup catalogue

use grid_model::{Entity, EntityId, Money};

const PRODUCTS: [(&str, &str); 10] = [
    ("Desk Lamp", "Lighting"),
    ("Office Chair", "Furniture"),
    ("Standing Desk", "Furniture"),
    ("Floor Lamp", "Lighting"),
    ("Bookshelf", "Storage"),
    ("Monitor Arm", "Accessories"),
    ("Filing Cabinet", "Storage"),
    ("Table Lamp", "Lighting"),
    ("Coat Rack", "Furniture"),
    ("Footrest", "Accessories"),
];

const FINISHES: [&str; 5] = ["Oak", "Walnut", "Steel", "Birch", "Matte"];

/// Build `count` entities with ids `1..=count`
///
/// The same `count` always yields the same catalogue.
#[must_use]
pub fn seed_entities(count: usize) -> Vec<Entity> {
    (0..count)
        .zip(1_u64..)
        .map(|(slot, i)| {
            let (product, category) = PRODUCTS[slot % PRODUCTS.len()];
            let finish = FINISHES[(slot / PRODUCTS.len()) % FINISHES.len()];
            // 5.00..=494.99, spread so neighbouring ids rarely share a price
            let cents = 500 + i64::try_from(i * 7_919 % 49_000).unwrap_or_default();
            Entity {
                id: EntityId(i),
                name: format!("{finish} {product}"),
                price: Money::from_cents(cents),
                quantity: i * 13 % 40,
                category: category.to_string(),
            }
        })
        .collect()
}
