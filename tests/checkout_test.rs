//! Integration tests for purchasing and redemption, including contention.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{harness, seed_event, seed_event_with_window, SeededEvent};
use ticketa_server::config::VerificationMode;
use ticketa_server::models::{InventoryError, OrderStatus};
use ticketa_server::services::{CheckoutError, PurchaseInput, RedeemError};

fn purchase(seeded: &SeededEvent, quantity: i64) -> PurchaseInput {
    PurchaseInput {
        event_id: seeded.event_id,
        ticket_type_id: seeded.ticket_type_id,
        quantity,
        coupon_code: None,
    }
}

fn inventory_reason(err: CheckoutError) -> InventoryError {
    match err {
        CheckoutError::Inventory(reason) => reason,
        other => panic!("expected an inventory error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_purchase_creates_paid_order_with_tickets() {
    let h = harness(VerificationMode::Email);
    let seeded = seed_event(&h.store, 2000, 10).await;
    let buyer = Uuid::new_v4();

    let result = h
        .state
        .checkout
        .purchase(buyer, purchase(&seeded, 3))
        .await
        .unwrap();

    assert_eq!(result.order.status, OrderStatus::Paid);
    assert_eq!(result.order.amount_cents, 6000);
    assert_eq!(result.order.user_id, buyer);
    assert_eq!(result.tickets.len(), 3);
    assert!(result.tickets.iter().all(|t| t.qr_code.starts_with("TCK-")));
    assert!(result.tickets.iter().all(|t| t.used_at.is_none()));

    let ticket_type = h.store.ticket_type(seeded.ticket_type_id).await.unwrap();
    assert_eq!(ticket_type.qty_sold, 3);

    let orders = h.state.checkout.orders_for_user(buyer).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].tickets.len(), 3);
    let strangers = h
        .state
        .checkout
        .orders_for_user(Uuid::new_v4())
        .await
        .unwrap();
    assert!(strangers.is_empty());
}

#[tokio::test]
async fn test_quantity_bounds() {
    let h = harness(VerificationMode::Email);
    let seeded = seed_event(&h.store, 1000, 50).await;

    for quantity in [0, -1, 11] {
        let err = h
            .state
            .checkout
            .purchase(Uuid::new_v4(), purchase(&seeded, quantity))
            .await
            .unwrap_err();
        let rejected = matches!(err, CheckoutError::InvalidQuantity);
        assert!(rejected, "quantity {quantity}");
    }
    assert_eq!(h.store.ticket_count().await, 0);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_no_trace() {
    let h = harness(VerificationMode::Email);
    let seeded = seed_event(&h.store, 1000, 2).await;

    let err = h
        .state
        .checkout
        .purchase(Uuid::new_v4(), purchase(&seeded, 3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Inventory(InventoryError::InsufficientStock { remaining: 2 })
    ));

    let ticket_type = h.store.ticket_type(seeded.ticket_type_id).await.unwrap();
    assert_eq!(ticket_type.qty_sold, 0);
    assert_eq!(h.store.ticket_count().await, 0);
}

#[tokio::test]
async fn test_ticket_type_must_belong_to_event() {
    let h = harness(VerificationMode::Email);
    let first = seed_event(&h.store, 1000, 5).await;
    let second = seed_event(&h.store, 1000, 5).await;

    let foreign_type = PurchaseInput {
        ticket_type_id: second.ticket_type_id,
        ..purchase(&first, 1)
    };
    let err = h
        .state
        .checkout
        .purchase(Uuid::new_v4(), foreign_type)
        .await
        .unwrap_err();
    assert_eq!(inventory_reason(err), InventoryError::InvalidTicketType);

    let unknown_type = PurchaseInput {
        ticket_type_id: Uuid::new_v4(),
        ..purchase(&first, 1)
    };
    let err = h
        .state
        .checkout
        .purchase(Uuid::new_v4(), unknown_type)
        .await
        .unwrap_err();
    assert_eq!(inventory_reason(err), InventoryError::InvalidTicketType);
}

#[tokio::test]
async fn test_sales_window_is_enforced() {
    let h = harness(VerificationMode::Email);
    let now = Utc::now();
    let opens = Some(now + Duration::days(1));
    let closed = Some(now - Duration::days(1));
    let later = seed_event_with_window(&h.store, 1000, 5, opens, None).await;
    let over = seed_event_with_window(&h.store, 1000, 5, None, closed).await;

    for seeded in [later, over] {
        let err = h
            .state
            .checkout
            .purchase(Uuid::new_v4(), purchase(&seeded, 1))
            .await
            .unwrap_err();
        assert_eq!(inventory_reason(err), InventoryError::SalesClosed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_never_oversell() {
    let h = harness(VerificationMode::Email);
    let remaining = 7;
    let per_order = 2;
    let buyers = 20;
    let seeded = seed_event(&h.store, 500, remaining).await;
    let checkout = Arc::new(h.state.checkout.clone());

    let mut handles = Vec::with_capacity(buyers);
    for _ in 0..buyers {
        let checkout = checkout.clone();
        let input = purchase(&seeded, per_order);
        handles.push(tokio::spawn(async move {
            checkout.purchase(Uuid::new_v4(), input).await
        }));
    }

    let mut succeeded = 0;
    let mut codes = HashSet::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(result) => {
                succeeded += 1;
                for ticket in result.tickets {
                    assert!(codes.insert(ticket.qr_code));
                }
            }
            Err(CheckoutError::Inventory(reason)) => {
                assert!(matches!(reason, InventoryError::InsufficientStock { .. }));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let expected = (remaining as i64 / per_order) as usize;
    assert_eq!(succeeded, expected.min(buyers));

    let ticket_type = h.store.ticket_type(seeded.ticket_type_id).await.unwrap();
    let sold = succeeded * per_order as usize;
    assert_eq!(ticket_type.qty_sold as usize, sold);
    assert!(ticket_type.qty_sold <= ticket_type.qty_total);
    assert_eq!(h.store.ticket_count().await, codes.len());
}

#[tokio::test]
async fn test_ticket_redeems_once() {
    let h = harness(VerificationMode::Email);
    let seeded = seed_event(&h.store, 1000, 5).await;
    let result = h
        .state
        .checkout
        .purchase(Uuid::new_v4(), purchase(&seeded, 1))
        .await
        .unwrap();
    let code = &result.tickets[0].qr_code;

    let ticket = h.state.tickets.redeem(code).await.unwrap();
    assert_eq!(ticket.id, result.tickets[0].id);
    assert!(ticket.used_at.is_some());

    let err = h.state.tickets.redeem(code).await.unwrap_err();
    assert!(matches!(err, RedeemError::AlreadyUsed));
}

#[tokio::test]
async fn test_redeem_unknown_or_malformed_code() {
    let h = harness(VerificationMode::Email);

    let err = h
        .state
        .tickets
        .redeem("TCK-doesnotexist")
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::NotFound));

    let err = h.state.tickets.redeem("abc").await.unwrap_err();
    assert!(matches!(err, RedeemError::Invalid(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemption_has_single_winner() {
    let h = harness(VerificationMode::Email);
    let seeded = seed_event(&h.store, 1000, 1).await;
    let result = h
        .state
        .checkout
        .purchase(Uuid::new_v4(), purchase(&seeded, 1))
        .await
        .unwrap();
    let code = result.tickets[0].qr_code.clone();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let tickets = h.state.tickets.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move { tickets.redeem(&code).await }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(RedeemError::AlreadyUsed) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1);
}
