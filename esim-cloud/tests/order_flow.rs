//! Order lifecycle: creation, payment events, provisioning

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use esim_cloud::catalog::CatalogService;
use esim_cloud::orders::{Caller, OrderSettings, PaymentInitiation};
use esim_cloud::pricing::RateResolver;
use esim_cloud::store::{CatalogStore, OrderStore};
use rust_decimal_macros::dec;
use shared::error::ErrorCode;
use shared::models::{OrderStatus, PaymentStatus};

#[tokio::test]
async fn test_markup_order_is_priced_in_local_currency() {
    let fx = Fixture::new().await;

    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();

    assert_eq!(resp.amount, dec!(41400));
    assert_eq!(resp.currency, "MNT");
    assert_eq!(resp.status, OrderStatus::Pending);
    assert_eq!(resp.invoice_id, "INV-1");
    assert_eq!(resp.payment_url, "https://qpay.test/pay/1");

    let invoice = fx.gateway.last_invoice().unwrap();
    assert_eq!(invoice.amount, 41400);
    assert_eq!(invoice.order_number, resp.order_number);
    assert_eq!(invoice.receiver, "traveler@example.mn");
    assert_eq!(invoice.description, "eSIM Japan - 3GB (3GB 7 Days)");

    let view = fx.service.get_order(&resp.order_number).await.unwrap();
    assert_eq!(view.order.invoice_id.as_deref(), Some("INV-1"));
    assert_eq!(view.qr_code.as_deref(), Some("QR-1"));
    assert_eq!(view.payment_url.as_deref(), Some("https://qpay.test/pay/1"));

    let tx = fx.store.find_transaction(resp.id).await.unwrap().unwrap();
    assert_eq!(tx.status, PaymentStatus::Pending);
    assert_eq!(tx.provider_transaction_id, "INV-1");
    assert_eq!(tx.payment_method, "qpay");
}

#[tokio::test]
async fn test_order_amount_is_a_snapshot() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();

    let catalog = CatalogService::new(
        fx.store.clone(),
        fx.partner.clone(),
        RateResolver::new(fx.store.clone(), Arc::new(StaticFeed(None)), dec!(2850)),
        "MNT",
    );
    let repriced = catalog.set_markup(fx.package.id, dec!(100)).await.unwrap();
    assert_eq!(repriced.effective_price_usd, dec!(20.00));
    seed_rate(&fx.store, dec!(3600)).await;

    let view = fx.service.get_order(&resp.order_number).await.unwrap();
    assert_eq!(view.order.amount, dec!(41400));
    assert_eq!(view.order.currency, "MNT");
}

#[tokio::test]
async fn test_paid_webhook_provisions_once_across_redeliveries() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    let event = payment_event(&resp.order_number, "INV-1", "PAID");

    for _ in 0..3 {
        let outcome = fx.service.handle_payment_event(&event).await.unwrap();
        assert_eq!(outcome.order_status, OrderStatus::Completed);
        assert_eq!(outcome.payment_status, "PAID");
    }
    assert_eq!(fx.partner.call_count(), 1);

    let req = fx.partner.requests.lock()[0].clone();
    assert_eq!(req.sku_id, SKU);
    assert_eq!(req.package_id, PROVIDER_PRICE_ID.to_string());
    assert_eq!(req.quantity, 1);

    let order = fx.store.order(resp.id).unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.partner_order_id.as_deref(), Some("RW-1"));
    let artifact = order.esim_data.unwrap();
    assert_eq!(artifact["roamwifi_order_id"], "RW-1");
    assert_eq!(artifact["activation_code"], "CODE");

    let tx = fx.store.find_transaction(resp.id).await.unwrap().unwrap();
    assert_eq!(tx.status, PaymentStatus::Paid);
    assert_eq!(tx.provider_transaction_id, format!("TX-{}", resp.order_number));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_paid_events_provision_at_most_once() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    let event = payment_event(&resp.order_number, "INV-1", "PAID");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = fx.service.clone();
            let event = event.clone();
            tokio::spawn(async move { service.handle_payment_event(&event).await })
        })
        .collect();
    for result in futures::future::join_all(handles).await {
        assert!(result.unwrap().is_ok());
    }

    assert_eq!(fx.partner.call_count(), 1);
    assert_eq!(
        fx.store.order(resp.id).unwrap().status,
        OrderStatus::Completed
    );
}

#[tokio::test]
async fn test_unknown_order_number_mutates_nothing() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();

    let event = payment_event("ESIM0000000000000", "INV-1", "PAID");
    let err = fx.service.handle_payment_event(&event).await.unwrap_err();
    assert_eq!(app_code(err), ErrorCode::OrderNotFound);

    assert_eq!(fx.partner.call_count(), 0);
    assert_eq!(fx.store.order(resp.id).unwrap().status, OrderStatus::Pending);
    let tx = fx.store.find_transaction(resp.id).await.unwrap().unwrap();
    assert_eq!(tx.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_partner_error_fails_order_and_keeps_payment() {
    let fx = Fixture::new().await;
    *fx.partner.fail_with.lock() = Some("Insufficient balance".into());
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    let event = payment_event(&resp.order_number, "INV-1", "PAID");

    let outcome = fx.service.handle_payment_event(&event).await.unwrap();
    assert_eq!(outcome.order_status, OrderStatus::Failed);

    let order = fx.store.order(resp.id).unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    assert_eq!(order.failure_reason.as_deref(), Some("Insufficient balance"));
    assert!(order.partner_order_id.is_none());

    let tx = fx.store.find_transaction(resp.id).await.unwrap().unwrap();
    assert_eq!(tx.status, PaymentStatus::Paid);

    // Partner recovered, but a failed order is never retried by redelivery
    *fx.partner.fail_with.lock() = None;
    let outcome = fx.service.handle_payment_event(&event).await.unwrap();
    assert_eq!(outcome.order_status, OrderStatus::Failed);
    assert_eq!(fx.partner.call_count(), 1);
}

#[tokio::test]
async fn test_invoice_failure_keeps_failed_order_for_audit() {
    let fx = Fixture::new().await;
    *fx.gateway.fail_with.lock() = Some("INVOICE_CODE_INVALID".into());

    let err = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap_err();
    let esim_cloud::error::ServiceError::App(app) = err else {
        panic!("expected an app error");
    };
    assert_eq!(app.code, ErrorCode::InvoiceCreationFailed);
    assert_eq!(app.message, "INVOICE_CODE_INVALID");

    let order_number = app.details.unwrap()["order_number"]
        .as_str()
        .unwrap()
        .to_string();
    let view = fx.service.get_order(&order_number).await.unwrap();
    assert_eq!(view.order.status, OrderStatus::Failed);
    assert_eq!(
        view.order.failure_reason.as_deref(),
        Some("INVOICE_CODE_INVALID")
    );
    assert_eq!(fx.store.order_count(), 1);
}

#[tokio::test]
async fn test_rate_fallback_prices_order() {
    let fx = Fixture::with(None, OrderSettings::default()).await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    // 12.00 USD at the 2850 fallback
    assert_eq!(resp.amount, dec!(34200));
}

#[tokio::test]
async fn test_strict_rate_refuses_fallback_pricing() {
    let settings = OrderSettings {
        strict_rate: true,
        ..OrderSettings::default()
    };
    let fx = Fixture::with(None, settings).await;
    let err = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::RateUnavailable);
    assert_eq!(fx.store.order_count(), 0);
}

#[tokio::test]
async fn test_package_selection_rules() {
    let fx = Fixture::new().await;

    let mut req = order_request(&fx);
    req.package_price_id = None;
    let err = fx
        .service
        .create_order(req.clone(), Caller::guest())
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::PackageSelectionRequired);

    req.provider_price_id = Some(PROVIDER_PRICE_ID);
    let resp = fx
        .service
        .create_order(req.clone(), Caller::guest())
        .await
        .unwrap();
    assert_eq!(resp.package_price.id, fx.package.id);

    let foreign = package("999", 7777, dec!(5));
    fx.store.save_package_price(&foreign).await.unwrap();
    req.provider_price_id = Some(7777);
    let err = fx
        .service
        .create_order(req.clone(), Caller::guest())
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::PackageSkuMismatch);

    let mut inactive = package(SKU, 8888, dec!(5));
    inactive.active = false;
    fx.store.save_package_price(&inactive).await.unwrap();
    req.provider_price_id = Some(8888);
    let err = fx
        .service
        .create_order(req, Caller::guest())
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::PackageInactive);

    // Rejected requests never create orders
    assert_eq!(fx.store.order_count(), 1);
}

#[tokio::test]
async fn test_custom_price_is_admin_only() {
    let fx = Fixture::new().await;
    let mut req = order_request(&fx);
    req.custom_price_usd = Some(dec!(15));

    let err = fx
        .service
        .create_order(req.clone(), Caller::guest())
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::PermissionDenied);

    let admin = Caller {
        user_id: None,
        is_admin: true,
    };
    let resp = fx.service.create_order(req.clone(), admin).await.unwrap();
    assert_eq!(resp.amount, dec!(51750));

    req.custom_price_usd = Some(dec!(0));
    let err = fx.service.create_order(req, admin).await.unwrap_err();
    assert_eq!(app_code(err), ErrorCode::InvalidPrice);
}

#[tokio::test]
async fn test_contact_required() {
    let fx = Fixture::new().await;
    let mut req = order_request(&fx);
    req.customer_email = Some("   ".into());
    req.customer_phone = None;
    let err = fx
        .service
        .create_order(req.clone(), Caller::guest())
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::RequiredField);

    // Phone alone is enough; it becomes the invoice receiver
    req.customer_phone = Some("99001122".into());
    fx.service.create_order(req, Caller::guest()).await.unwrap();
    assert_eq!(fx.gateway.last_invoice().unwrap().receiver, "99001122");
}

#[tokio::test]
async fn test_initiate_payment_reissues_invoice() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();

    let result = fx
        .service
        .initiate_payment(&resp.order_number)
        .await
        .unwrap();
    let PaymentInitiation::InvoiceIssued { invoice_id, .. } = result else {
        panic!("expected a new invoice");
    };
    assert_eq!(invoice_id, "INV-2");
    assert_eq!(fx.gateway.checks.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(fx.gateway.last_invoice().unwrap().amount, 41400);

    let order = fx.store.order(resp.id).unwrap();
    assert_eq!(order.invoice_id.as_deref(), Some("INV-2"));
    assert_eq!(order.amount, dec!(41400));
    let tx = fx.store.find_transaction(resp.id).await.unwrap().unwrap();
    assert_eq!(tx.provider_transaction_id, "INV-2");
}

#[tokio::test]
async fn test_initiate_payment_settles_already_paid_invoice() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    *fx.gateway.check_status.lock() = Some(PaymentStatus::Paid);

    let result = fx
        .service
        .initiate_payment(&resp.order_number)
        .await
        .unwrap();
    let PaymentInitiation::AlreadyPaid { order_status, .. } = result else {
        panic!("expected the paid invoice to be settled");
    };
    assert_eq!(order_status, OrderStatus::Completed);
    assert_eq!(fx.partner.call_count(), 1);
    assert_eq!(fx.gateway.invoice_count(), 1);

    let err = fx
        .service
        .initiate_payment(&resp.order_number)
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::OrderAlreadyCompleted);
}

#[tokio::test]
async fn test_failed_payment_then_paid_does_not_provision() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();

    let outcome = fx
        .service
        .handle_payment_event(&payment_event(&resp.order_number, "INV-1", "FAILED"))
        .await
        .unwrap();
    assert_eq!(outcome.order_status, OrderStatus::Failed);
    assert_eq!(
        fx.store.order(resp.id).unwrap().failure_reason.as_deref(),
        Some("payment failed")
    );

    let outcome = fx
        .service
        .handle_payment_event(&payment_event(&resp.order_number, "INV-1", "PAID"))
        .await
        .unwrap();
    assert_eq!(outcome.order_status, OrderStatus::Failed);
    assert_eq!(fx.partner.call_count(), 0);
    // The capture is still recorded for reconciliation
    let tx = fx.store.find_transaction(resp.id).await.unwrap().unwrap();
    assert_eq!(tx.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_pending_event_only_touches_transaction() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    let outcome = fx
        .service
        .handle_payment_event(&payment_event(&resp.order_number, "INV-1", "PENDING"))
        .await
        .unwrap();
    assert_eq!(outcome.order_status, OrderStatus::Pending);
    let tx = fx.store.find_transaction(resp.id).await.unwrap().unwrap();
    assert_eq!(tx.transaction_data["payment_status"], "PENDING");
    assert_eq!(fx.partner.call_count(), 0);

    // The invoice links survive the event's payload
    let view = fx.service.get_order(&resp.order_number).await.unwrap();
    assert_eq!(view.payment_url.as_deref(), Some("https://qpay.test/pay/1"));
    assert_eq!(view.qr_code.as_deref(), Some("QR-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_late_pending_write_does_not_downgrade_paid() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    let mut slow = FaultyStore::new(fx.store.clone());
    slow.upsert_delay = Duration::from_millis(150);
    let slow_service = fx.service_over(Arc::new(slow));

    let pending = payment_event(&resp.order_number, "INV-1", "PENDING");
    let late = tokio::spawn(async move { slow_service.handle_payment_event(&pending).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let outcome = fx
        .service
        .handle_payment_event(&payment_event(&resp.order_number, "INV-1", "PAID"))
        .await
        .unwrap();
    assert_eq!(outcome.order_status, OrderStatus::Completed);
    late.await.unwrap().unwrap();

    let tx = fx.store.find_transaction(resp.id).await.unwrap().unwrap();
    assert_eq!(tx.status, PaymentStatus::Paid);
    assert_eq!(tx.transaction_data["payment_status"], "PAID");
    assert_eq!(
        fx.store.order(resp.id).unwrap().status,
        OrderStatus::Completed
    );
}

#[tokio::test]
async fn test_catalog_error_after_claim_fails_order() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    let store = Arc::new(FaultyStore::new(fx.store.clone()));
    store.fail_find_product.store(true, std::sync::atomic::Ordering::SeqCst);
    let service = fx.service_over(store);

    let outcome = service
        .handle_payment_event(&payment_event(&resp.order_number, "INV-1", "PAID"))
        .await
        .unwrap();
    assert_eq!(outcome.order_status, OrderStatus::Failed);
    assert_eq!(fx.partner.call_count(), 0);
    let order = fx.store.order(resp.id).unwrap();
    assert!(
        order
            .failure_reason
            .as_deref()
            .is_some_and(|r| r.contains("catalog lookup failed"))
    );
}

#[tokio::test]
async fn test_unrecorded_completion_fails_order_with_partner_id() {
    let fx = Fixture::new().await;
    let resp = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    let store = Arc::new(FaultyStore::new(fx.store.clone()));
    store.fail_complete.store(true, std::sync::atomic::Ordering::SeqCst);
    let service = fx.service_over(store);

    let outcome = service
        .handle_payment_event(&payment_event(&resp.order_number, "INV-1", "PAID"))
        .await
        .unwrap();
    assert_eq!(outcome.order_status, OrderStatus::Failed);
    assert_eq!(fx.partner.call_count(), 1);
    let order = fx.store.order(resp.id).unwrap();
    assert!(
        order
            .failure_reason
            .as_deref()
            .is_some_and(|r| r.contains("RW-1"))
    );

    // A redelivery cannot provision a second time
    service
        .handle_payment_event(&payment_event(&resp.order_number, "INV-1", "PAID"))
        .await
        .unwrap();
    assert_eq!(fx.partner.call_count(), 1);
}

#[tokio::test]
async fn test_delivery_notification_after_completion() {
    let fx = Fixture::new().await;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let service = fx
        .service
        .clone()
        .with_notifier(Arc::new(ChannelNotifier(tx)));
    let resp = service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();

    service
        .handle_payment_event(&payment_event(&resp.order_number, "INV-1", "PAID"))
        .await
        .unwrap();

    let notified = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap();
    assert_eq!(notified.as_deref(), Some("RW-1"));
}

#[tokio::test]
async fn test_list_orders_by_status() {
    let fx = Fixture::new().await;
    let first = fx
        .service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    fx.service
        .create_order(order_request(&fx), Caller::guest())
        .await
        .unwrap();
    fx.service
        .handle_payment_event(&payment_event(&first.order_number, "INV-1", "PAID"))
        .await
        .unwrap();

    let filter = esim_cloud::store::OrderFilter {
        status: Some(OrderStatus::Completed),
        ..Default::default()
    };
    let completed = fx.service.list_orders(&filter).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].order_number, first.order_number);

    let all = fx.service.list_orders(&Default::default()).await.unwrap();
    assert_eq!(all.len(), 2);
}
