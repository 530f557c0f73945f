//! Payment settlement and provisioning

use rust_decimal::Decimal;
use serde_json::json;
use shared::error::AppError;
use shared::models::{Order, OrderStatus, PaymentStatus, PaymentTransaction};
use uuid::Uuid;

use super::{OrderService, PAYMENT_METHOD, WebhookOutcome};
use crate::error::ServiceResult;
use crate::qpay::PaymentEvent;
use crate::roamwifi::ProvisionRequest;
use crate::store::StoreResult;
use crate::util::now_millis;

const PAYMENT_FAILED_REASON: &str = "payment failed";

impl OrderService {
    /// Apply one payment notification.
    ///
    /// Safe to call repeatedly for the same event: terminal and in-flight
    /// orders are left untouched and provisioning runs at most once.
    pub async fn handle_payment_event(&self, event: &PaymentEvent) -> ServiceResult<WebhookOutcome> {
        let order = self
            .orders
            .find_order_by_number(&event.order_number)
            .await?
            .ok_or_else(|| AppError::order_not_found(&event.order_number))?;

        tracing::info!(
            order_number = %order.order_number,
            invoice_id = %event.invoice_id,
            status = %event.provider_status,
            order_status = %order.status,
            "Payment event received"
        );

        self.record_payment(
            &order,
            &event.transaction_id,
            event.paid_amount,
            event.status,
            json!({
                "invoice_id": event.invoice_id,
                "payment_date": event.payment_date,
                "paid_amount": event.paid_amount,
                "payment_status": event.provider_status,
            }),
        )
        .await?;

        let order_status = match event.status {
            PaymentStatus::Paid => self.settle_paid(&order).await?,
            PaymentStatus::Failed if order.status == OrderStatus::Pending => {
                self.orders
                    .fail_order(order.id, OrderStatus::Pending, PAYMENT_FAILED_REASON)
                    .await?;
                self.current_status(order.id, order.status).await?
            }
            _ => order.status,
        };

        Ok(WebhookOutcome {
            invoice_id: event.invoice_id.clone(),
            order_number: order.order_number,
            payment_status: event.provider_status.clone(),
            order_status,
        })
    }

    /// Upsert the order's transaction; a paid transaction is never downgraded
    pub(super) async fn record_payment(
        &self,
        order: &Order,
        provider_transaction_id: &str,
        amount: Decimal,
        status: PaymentStatus,
        data: serde_json::Value,
    ) -> ServiceResult<()> {
        let now = now_millis();
        let tx = PaymentTransaction {
            id: Uuid::new_v4(),
            order_id: order.id,
            provider_transaction_id: provider_transaction_id.to_string(),
            amount,
            status,
            payment_method: PAYMENT_METHOD.to_string(),
            transaction_data: data,
            created_at: now,
            updated_at: now,
        };
        if !self.orders.upsert_transaction(&tx).await? {
            tracing::debug!(order_number = %order.order_number, %status, "Ignoring status for a paid transaction");
        }
        Ok(())
    }

    /// `pending -> paid`, then claim `paid -> processing` and provision.
    ///
    /// Returns the order status after this call.
    pub(super) async fn settle_paid(&self, order: &Order) -> ServiceResult<OrderStatus> {
        if order.status == OrderStatus::Pending
            && self
                .orders
                .transition_status(order.id, OrderStatus::Pending, OrderStatus::Paid)
                .await?
        {
            tracing::info!(order_number = %order.order_number, "Order paid");
        }

        let claimed = self
            .orders
            .transition_status(order.id, OrderStatus::Paid, OrderStatus::Processing)
            .await?;
        if claimed {
            self.provision(order).await?;
        }
        let status = self.current_status(order.id, order.status).await?;
        if !claimed {
            if status.is_terminal() && status != OrderStatus::Completed {
                tracing::error!(
                    order_number = %order.order_number,
                    order_status = %status,
                    "Payment captured for a closed order, manual reconciliation required"
                );
            } else {
                tracing::debug!(order_number = %order.order_number, "Provisioning not claimed");
            }
        }
        Ok(status)
    }

    async fn current_status(
        &self,
        order_id: Uuid,
        last_known: OrderStatus,
    ) -> ServiceResult<OrderStatus> {
        Ok(self
            .orders
            .find_order(order_id)
            .await?
            .map_or(last_known, |o| o.status))
    }

    /// Call the partner for an order this caller has claimed (`processing`).
    ///
    /// Every exit leaves the order `completed` or `failed`.
    async fn provision(&self, order: &Order) -> ServiceResult<()> {
        let req = match self.provision_request(order).await {
            Ok(Some(req)) => req,
            Ok(None) => {
                tracing::error!(order_number = %order.order_number, "Provisioning failed: product missing");
                self.orders
                    .fail_order(order.id, OrderStatus::Processing, "product not found")
                    .await?;
                return Ok(());
            }
            Err(e) => {
                tracing::error!(order_number = %order.order_number, error = %e, "Provisioning failed: catalog lookup");
                let reason = format!("catalog lookup failed: {e}");
                self.orders
                    .fail_order(order.id, OrderStatus::Processing, &reason)
                    .await?;
                return Ok(());
            }
        };

        match self.partner.create_order(&req).await {
            Ok(provisioned) => {
                let artifact = provisioned.delivery_artifact();
                let completed = match self
                    .orders
                    .complete_order(order.id, &provisioned.partner_order_id, &artifact)
                    .await
                {
                    Ok(completed) => completed,
                    Err(e) => {
                        tracing::error!(
                            order_number = %order.order_number,
                            partner_order_id = %provisioned.partner_order_id,
                            esim_data = %artifact,
                            error = %e,
                            "Partner order created but not recorded, manual reconciliation required"
                        );
                        let reason = format!(
                            "partner order {} created but not recorded: {e}",
                            provisioned.partner_order_id
                        );
                        if let Err(e) = self
                            .orders
                            .fail_order(order.id, OrderStatus::Processing, &reason)
                            .await
                        {
                            tracing::error!(order_number = %order.order_number, error = %e, "Could not mark order failed");
                        }
                        return Ok(());
                    }
                };
                if !completed {
                    tracing::error!(
                        order_number = %order.order_number,
                        partner_order_id = %provisioned.partner_order_id,
                        "Order left processing before completion was recorded"
                    );
                    return Ok(());
                }
                tracing::info!(
                    order_number = %order.order_number,
                    partner_order_id = %provisioned.partner_order_id,
                    "Order completed"
                );
                if let Some(notifier) = self.notifier.clone() {
                    let order = order.clone();
                    tokio::spawn(async move {
                        if let Err(e) = notifier.notify(&order, &provisioned).await {
                            tracing::warn!(order_number = %order.order_number, error = %e, "Delivery notification failed");
                        }
                    });
                }
            }
            Err(e) => {
                let reason = e.partner_message();
                tracing::error!(
                    order_number = %order.order_number,
                    error = %e,
                    "Provisioning failed, manual reconciliation required"
                );
                self.orders
                    .fail_order(order.id, OrderStatus::Processing, &reason)
                    .await?;
            }
        }
        Ok(())
    }

    /// Resolve the partner SKU and package; `None` when the product is gone
    async fn provision_request(&self, order: &Order) -> StoreResult<Option<ProvisionRequest>> {
        let Some(product) = self.catalog.find_product(order.product_id).await? else {
            return Ok(None);
        };
        let package_id = match order.provider_price_id {
            Some(pid) => pid.to_string(),
            None => match order.package_price_id {
                Some(id) => match self.catalog.find_package_price(id).await? {
                    Some(p) => p.provider_price_id.to_string(),
                    None => product.sku_id.clone(),
                },
                None => product.sku_id.clone(),
            },
        };
        Ok(Some(ProvisionRequest {
            sku_id: product.sku_id,
            package_id,
            customer_email: order.customer_email.clone(),
            customer_phone: order.customer_phone.clone(),
            quantity: 1,
        }))
    }
}
