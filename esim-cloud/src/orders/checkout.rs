//! Order creation and payment initiation

use rust_decimal::Decimal;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Order, OrderStatus, PackagePrice, PaymentStatus, PaymentTransaction, Product,
};
use uuid::Uuid;

use super::{
    Caller, CreateOrderRequest, OrderResponse, OrderService, OrderView, PAYMENT_METHOD,
    PaymentInitiation,
};
use crate::error::ServiceResult;
use crate::pricing::{RateOrigin, resolve::to_local, resolve_effective_price};
use crate::qpay::{Invoice, InvoiceRequest};
use crate::store::{OrderFilter, StoreError};
use crate::util::{generate_order_number, now_millis};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn invoice_data(invoice: &Invoice) -> serde_json::Value {
    json!({
        "qr_code": invoice.qr_code,
        "web_url": invoice.web_url,
        "app_url": invoice.app_url,
    })
}

impl OrderService {
    pub async fn create_order(
        &self,
        req: CreateOrderRequest,
        caller: Caller,
    ) -> ServiceResult<OrderResponse> {
        let customer_email = non_empty(&req.customer_email);
        let customer_phone = non_empty(&req.customer_phone);
        if customer_email.is_none() && customer_phone.is_none() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "customer_email or customer_phone is required",
            )
            .into());
        }

        if let Some(custom) = req.custom_price_usd {
            if !caller.is_admin {
                return Err(AppError::with_message(
                    ErrorCode::PermissionDenied,
                    "custom_price_usd is restricted to administrators",
                )
                .into());
            }
            if custom <= Decimal::ZERO {
                return Err(AppError::with_message(
                    ErrorCode::InvalidPrice,
                    "custom_price_usd must be greater than zero",
                )
                .into());
            }
        }

        let product = self
            .catalog
            .find_product(req.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                AppError::new(ErrorCode::ProductNotFound)
                    .with_detail("product_id", req.product_id.to_string())
            })?;
        let package = self.select_package(&req, &product).await?;

        let resolution = self
            .rates
            .get_rate("USD", &self.settings.local_currency)
            .await;
        if self.settings.strict_rate && resolution.origin == RateOrigin::Fallback {
            return Err(AppError::with_message(
                ErrorCode::RateUnavailable,
                "No exchange rate available; new orders are paused",
            )
            .into());
        }
        let amount = match req.custom_price_usd {
            Some(usd) => Some(to_local(usd, resolution.rate)),
            None => resolve_effective_price(&package, Some(resolution.rate)).local,
        }
        .ok_or_else(|| AppError::new(ErrorCode::RateUnavailable))?;

        let order = self
            .insert_new_order(&req, &caller, &package, amount, customer_email, customer_phone)
            .await?;
        tracing::info!(
            order_number = %order.order_number,
            amount = %order.amount,
            currency = %order.currency,
            rate = %resolution.rate,
            rate_origin = ?resolution.origin,
            "Order created"
        );

        let invoice_req = InvoiceRequest {
            order_number: order.order_number.clone(),
            description: format!(
                "eSIM {} - {} ({})",
                product.name, product.data_limit, package.show_name
            ),
            receiver: order
                .customer_email
                .clone()
                .or_else(|| order.customer_phone.clone())
                .unwrap_or_default(),
            amount: invoice_amount(order.amount),
        };
        let invoice = match self.gateway.create_invoice(&invoice_req).await {
            Ok(invoice) => invoice,
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(order_number = %order.order_number, error = %reason, "Invoice creation failed");
                self.orders
                    .fail_order(order.id, OrderStatus::Pending, &reason)
                    .await?;
                return Err(AppError::upstream(ErrorCode::InvoiceCreationFailed, reason)
                    .with_detail("order_number", order.order_number)
                    .into());
            }
        };

        self.orders
            .set_invoice_id(order.id, &invoice.invoice_id)
            .await?;
        self.record_invoice(&order, &invoice).await?;

        Ok(OrderResponse {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            amount: order.amount,
            currency: order.currency,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            product,
            package_price: package,
            invoice_id: invoice.invoice_id,
            payment_url: invoice.web_url,
            qr_code: invoice.qr_code,
            app_url: invoice.app_url,
            created_at: order.created_at,
        })
    }

    /// Package-price id first, then the partner's price id
    async fn select_package(
        &self,
        req: &CreateOrderRequest,
        product: &Product,
    ) -> ServiceResult<PackagePrice> {
        let package = match (req.package_price_id, req.provider_price_id) {
            (Some(id), _) => self.catalog.find_package_price(id).await?,
            (None, Some(pid)) => self.catalog.find_package_by_provider_id(pid).await?,
            (None, None) => return Err(AppError::new(ErrorCode::PackageSelectionRequired).into()),
        }
        .ok_or_else(|| AppError::new(ErrorCode::PackageNotFound))?;

        if package.sku_id != product.sku_id {
            return Err(AppError::new(ErrorCode::PackageSkuMismatch)
                .with_detail("package_sku", package.sku_id)
                .with_detail("product_sku", product.sku_id.clone())
                .into());
        }
        if !package.active {
            return Err(AppError::new(ErrorCode::PackageInactive)
                .with_detail("provider_price_id", package.provider_price_id)
                .into());
        }
        Ok(package)
    }

    async fn insert_new_order(
        &self,
        req: &CreateOrderRequest,
        caller: &Caller,
        package: &PackagePrice,
        amount: Decimal,
        customer_email: Option<String>,
        customer_phone: Option<String>,
    ) -> ServiceResult<Order> {
        let now = now_millis();
        let mut order = Order {
            id: Uuid::new_v4(),
            order_number: generate_order_number(),
            user_id: caller.user_id,
            product_id: req.product_id,
            package_price_id: Some(package.id),
            provider_price_id: Some(package.provider_price_id),
            amount,
            currency: self.settings.local_currency.clone(),
            customer_email,
            customer_phone,
            invoice_id: None,
            partner_order_id: None,
            esim_data: None,
            failure_reason: None,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            match self.orders.insert_order(&order).await {
                Ok(()) => return Ok(order),
                Err(StoreError::Duplicate(number)) => {
                    tracing::warn!(order_number = %number, attempt, "Order number collision");
                    order.order_number = generate_order_number();
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::new(ErrorCode::OrderNumberExhausted).into())
    }

    async fn record_invoice(&self, order: &Order, invoice: &Invoice) -> ServiceResult<()> {
        let now = now_millis();
        let tx = PaymentTransaction {
            id: Uuid::new_v4(),
            order_id: order.id,
            provider_transaction_id: invoice.invoice_id.clone(),
            amount: order.amount,
            status: PaymentStatus::Pending,
            payment_method: PAYMENT_METHOD.to_string(),
            transaction_data: invoice_data(invoice),
            created_at: now,
            updated_at: now,
        };
        self.orders.upsert_transaction(&tx).await?;
        Ok(())
    }

    async fn load_order(&self, order_number: &str) -> ServiceResult<Order> {
        Ok(self
            .orders
            .find_order_by_number(order_number)
            .await?
            .ok_or_else(|| AppError::order_not_found(order_number))?)
    }

    /// Last persisted state, never an optimistic one
    pub async fn get_order(&self, order_number: &str) -> ServiceResult<OrderView> {
        let order = self.load_order(order_number).await?;
        let tx = self.orders.find_transaction(order.id).await?;
        Ok(OrderView {
            payment_url: tx.as_ref().and_then(|t| t.web_url()).map(String::from),
            qr_code: tx.as_ref().and_then(|t| t.qr_code()).map(String::from),
            order,
        })
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> ServiceResult<Vec<Order>> {
        Ok(self.orders.list_orders(filter).await?)
    }

    /// Re-check the current invoice of a pending order, or issue a new one.
    ///
    /// The order keeps its amount; a failed re-issue leaves it pending.
    pub async fn initiate_payment(&self, order_number: &str) -> ServiceResult<PaymentInitiation> {
        let order = self.load_order(order_number).await?;
        match order.status {
            OrderStatus::Pending => {}
            OrderStatus::Paid | OrderStatus::Processing => {
                return Err(AppError::new(ErrorCode::OrderAlreadyPaid).into());
            }
            OrderStatus::Completed => {
                return Err(AppError::new(ErrorCode::OrderAlreadyCompleted).into());
            }
            OrderStatus::Failed => return Err(AppError::new(ErrorCode::OrderFailed).into()),
            OrderStatus::Cancelled => return Err(AppError::new(ErrorCode::OrderNotPending).into()),
        }

        if let Some(invoice_id) = order.invoice_id.as_deref() {
            match self.gateway.check_payment(invoice_id).await {
                Ok(check) if check.status == PaymentStatus::Paid => {
                    tracing::info!(order_number, invoice_id, "Invoice already paid");
                    self.record_payment(
                        &order,
                        check
                            .transaction_id
                            .as_deref()
                            .unwrap_or(invoice_id),
                        check.paid_amount.unwrap_or(order.amount),
                        PaymentStatus::Paid,
                        json!({
                            "invoice_id": invoice_id,
                            "payment_date": check.payment_date,
                            "paid_amount": check.paid_amount,
                            "payment_status": check.provider_status,
                        }),
                    )
                    .await?;
                    let order_status = self.settle_paid(&order).await?;
                    return Ok(PaymentInitiation::AlreadyPaid {
                        order_number: order.order_number,
                        order_status,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(order_number, invoice_id, error = %e, "Payment check failed, issuing a new invoice");
                }
            }
        }

        let product = self
            .catalog
            .find_product(order.product_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
        let show_name = match order.package_price_id {
            Some(id) => self
                .catalog
                .find_package_price(id)
                .await?
                .map(|p| p.show_name)
                .unwrap_or_default(),
            None => String::new(),
        };
        let req = InvoiceRequest {
            order_number: order.order_number.clone(),
            description: format!(
                "eSIM {} - {} ({})",
                product.name, product.data_limit, show_name
            ),
            receiver: order
                .customer_email
                .clone()
                .or_else(|| order.customer_phone.clone())
                .unwrap_or_default(),
            amount: invoice_amount(order.amount),
        };
        let invoice = self.gateway.create_invoice(&req).await.map_err(|e| {
            tracing::error!(order_number, error = %e, "Invoice re-issue failed");
            AppError::upstream(ErrorCode::InvoiceCreationFailed, e.to_string())
        })?;

        self.orders
            .set_invoice_id(order.id, &invoice.invoice_id)
            .await?;
        self.record_invoice(&order, &invoice).await?;
        tracing::info!(order_number, invoice_id = %invoice.invoice_id, "Invoice re-issued");

        Ok(PaymentInitiation::InvoiceIssued {
            order_number: order.order_number,
            invoice_id: invoice.invoice_id,
            payment_url: invoice.web_url,
            qr_code: invoice.qr_code,
            app_url: invoice.app_url,
        })
    }
}

/// The gateway takes whole units only; fractions are dropped, not rounded
pub fn invoice_amount(amount: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    amount.trunc().to_i64().unwrap_or_default()
}
