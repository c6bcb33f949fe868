//! Flows across the core state machines, as a browser page drives them.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use serde_json::json;

use souk_core::cart::{Cart, CartError, CheckoutOutcome, Shipping};
use souk_core::catalog;
use souk_core::lockout::{Gate, LockReason, LockTransition, LockoutPolicy, LockoutRegistry};
use souk_core::session::{LockState, OwnerSession, SessionEnd};
use souk_core::{CreateOrderRequest, Product, ProductId};

fn product(title: &str, price: &str, sold_out: bool, minutes_ago: i64) -> Product {
    Product {
        id: ProductId::generate(),
        title: title.to_owned(),
        description: format!("Handmade {}", title.to_lowercase()),
        price: price.parse().unwrap(),
        image_url: "https://res.cloudinary.com/demo/image/upload/item.jpg".to_owned(),
        asset_id: None,
        sold_out,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

#[test]
fn test_browse_fill_cart_and_checkout() {
    let mut products = vec![
        product("Clay Pot", "250.00", false, 30),
        product("Woven Basket", "80.50", false, 10),
        product("Silver Ring", "1200", true, 20),
    ];
    catalog::sort_newest_first(&mut products);
    assert_eq!(products[0].title, "Woven Basket");

    let handmade = catalog::search(&products, "HANDMADE");
    assert_eq!(handmade.len(), 3);
    let baskets = catalog::search(&products, "basket");
    assert_eq!(baskets.len(), 1);

    let mut cart = Cart::new();
    cart.add(baskets[0]).unwrap();
    cart.add(baskets[0]).unwrap();
    cart.add(&products[2]).unwrap();
    assert_eq!(
        cart.add(&products[1]),
        Err(CartError::SoldOut("Silver Ring".to_owned()))
    );
    assert_eq!(cart.item_count(), 3);
    assert_eq!(cart.subtotal(), "411.00".parse().unwrap());

    let shipping = Shipping {
        phone: " 0911000000 ".to_owned(),
        city: "Addis Ababa".to_owned(),
        location: "Bole".to_owned(),
    };
    let request = cart.checkout_request(&shipping).unwrap();
    assert_eq!(request.phone, "0911000000");

    // What the browser posts is what the server reads back
    let wire = serde_json::to_value(&request).unwrap();
    let received: CreateOrderRequest = serde_json::from_value(wire).unwrap();
    let quantities = received.quantities().unwrap();
    assert_eq!(quantities[&baskets[0].id], 2);
    assert_eq!(quantities[&products[2].id], 1);

    let titles = cart.apply_checkout_outcome(CheckoutOutcome::Placed);
    assert!(titles.is_empty());
    assert!(cart.is_empty());
}

#[test]
fn test_browser_cart_lines_are_accepted() {
    let id = ProductId::generate();
    let body = json!({
        "products": [
            { "id": id, "title": "Clay Pot", "price": 250, "quantity": 2 },
            { "id": id, "title": "Clay Pot", "price": 1, "quantity": 1 },
        ],
        "phone": "0911000000",
        "city": "Hawassa",
        "location": "Piazza",
    });
    let request: CreateOrderRequest = serde_json::from_value(body).unwrap();
    assert_eq!(request.quantities().unwrap()[&id], 3);
}

#[test]
fn test_sold_out_rejection_keeps_cart() {
    let pot = product("Clay Pot", "250.00", false, 0);
    let mut cart = Cart::new();
    cart.add(&pot).unwrap();

    let titles =
        cart.apply_checkout_outcome(CheckoutOutcome::SoldOut(vec!["Clay Pot".to_owned()]));
    assert_eq!(titles, vec!["Clay Pot".to_owned()]);
    assert_eq!(cart.item_count(), 1);
}

#[test]
fn test_failed_logins_lock_the_dashboard() {
    let now = Utc::now();
    let mut registry = LockoutRegistry::new(LockoutPolicy::default());
    let mut session = OwnerSession::default();
    let mut lock = LockState::default();

    assert!(registry.gate_login("owner", now).is_open());
    assert!(registry.record_login_failure("owner", now).is_none());
    let transition = registry
        .record_login_failure("owner", now + Duration::seconds(5))
        .unwrap();
    assert!(matches!(
        transition,
        LockTransition::Locked {
            reason: LockReason::FailedLogins,
            ..
        }
    ));
    lock.lock(transition.until());

    // Every further attempt is refused and pushes the lock out
    let later = now + Duration::minutes(1);
    let Gate::Locked { until, transition } = registry.gate_login("owner", later) else {
        panic!("expected the username to be locked");
    };
    assert_eq!(until, later + Duration::minutes(5));
    assert!(matches!(transition, Some(LockTransition::Extended { .. })));
    lock.lock(until);

    assert_eq!(lock.guard(later, || "login"), Err(until));
    assert!(!session.is_authenticated(later));

    // After the lock the owner can sign in again
    let free = until + Duration::seconds(1);
    assert!(registry.gate_login("owner", free).is_open());
    assert_eq!(lock.guard(free, || "login"), Ok("login"));
    registry.record_login_success("owner");
    session.authenticate("tok", "owner", free + Duration::hours(1));
    assert_eq!(session.token(free), Some("tok"));

    assert_eq!(
        session.end(SessionEnd::Logout),
        Some(SessionEnd::Logout)
    );
}

#[test]
fn test_request_flood_locks_only_that_address() {
    let now = Utc::now();
    let policy = LockoutPolicy::default();
    let mut registry = LockoutRegistry::new(policy);

    for i in 0..policy.rate_max_requests {
        let at = now + Duration::milliseconds(i64::from(i));
        assert!(registry.record_request("198.51.100.7", at).is_open());
    }
    let Gate::Locked { until, transition } = registry.record_request("198.51.100.7", now) else {
        panic!("expected a request-rate lock");
    };
    assert_eq!(until, now + policy.lock_duration);
    assert_eq!(transition.unwrap().reason(), LockReason::RequestRate);

    assert!(registry.record_request("203.0.113.1", now).is_open());
    assert_eq!(registry.active(now).len(), 1);
    assert!(
        registry
            .record_request("198.51.100.7", until + Duration::seconds(1))
            .is_open()
    );
}
