//! Order lifecycle: creation with unique codes, accept, decline and the
//! expiry sweep.

use askama::Template;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ActiveModelTrait, Condition, PaginatorTrait, QueryOrder, Set};
use std::sync::Arc;

use super::transaction_service::ensure_owner;
use super::{NotificationService, ServiceContext, TransactionService, VendorService};
use crate::domain::{OrderStatus, OrderType, TransactionStatus};
use crate::entity::{orders, rates, transactions, vendors};
use crate::error::{is_unique_violation, VendoraError, VendoraResult};
use crate::gating;
use crate::models::{AcceptOrder, NewOrder, OrderFilter, SweepReport};
use crate::order_code::{candidate_sequences, format_order_code, is_order_code};
use crate::telegram::{send_best_effort, Button, OutboundMessage};
use crate::templates::{format_amount, format_money, OrderAcceptedMessage, OrderDeclinedMessage};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

pub struct OrderService {
    ctx: ServiceContext,
    vendors: Arc<VendorService>,
    transactions: Arc<TransactionService>,
    notifications: Arc<NotificationService>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl OrderService {
    pub fn new(
        ctx: ServiceContext,
        vendors: Arc<VendorService>,
        transactions: Arc<TransactionService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            ctx,
            vendors,
            transactions,
            notifications,
        }
    }

    pub async fn get(&self, id: i32) -> VendoraResult<orders::Model> {
        orders::Entity::find_by_id(id)
            .one(self.ctx.db.as_ref())
            .await?
            .ok_or_else(|| VendoraError::not_found("Order"))
    }

    /// Order visible to `actor`: their own, or any order for staff.
    pub async fn get_for_vendor(&self, actor: &vendors::Model, id: i32) -> VendoraResult<orders::Model> {
        let order = self.get(id).await?;
        if ensure_owner(actor, order.vendor_id).is_err() {
            return Err(VendoraError::not_found("Order"));
        }
        Ok(order)
    }

    pub async fn count_created_today(&self, vendor_id: i32, now: DateTime<Utc>) -> VendoraResult<u64> {
        let start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);
        Ok(orders::Entity::find()
            .filter(orders::Column::VendorId.eq(vendor_id))
            .filter(orders::Column::CreatedAt.gte(start))
            .count(self.ctx.db.as_ref())
            .await?)
    }

    /// Creates a pending order. The order code is claimed by inserting and
    /// retrying on the unique index, so concurrent creates never share one.
    pub async fn create(&self, vendor: &vendors::Model, input: NewOrder) -> VendoraResult<orders::Model> {
        let now = Utc::now();
        gating::check_service(vendor, now)?;
        if input.amount <= Decimal::ZERO {
            return Err(VendoraError::validation("Amount must be greater than zero."));
        }
        let asset = input.asset.trim().to_uppercase();
        if asset.is_empty() {
            return Err(VendoraError::validation("Asset is required."));
        }
        let rate = match input.rate {
            Some(rate) => rate,
            None => {
                let configured = rates::Entity::find()
                    .filter(rates::Column::VendorId.eq(vendor.id))
                    .filter(rates::Column::Asset.eq(asset.as_str()))
                    .one(self.ctx.db.as_ref())
                    .await?
                    .ok_or_else(|| VendoraError::NotFound(format!("No rate configured for {}.", asset)))?;
                configured.rate_for(input.order_type)
            }
        };
        if rate <= Decimal::ZERO {
            return Err(VendoraError::validation("Rate must be greater than zero."));
        }

        let expire_minutes = vendor
            .auto_expire_minutes
            .filter(|m| *m > 0)
            .map(i64::from)
            .unwrap_or(self.ctx.config.order_auto_expire_minutes);
        let first_seq = self.count_created_today(vendor.id, now).await? as i64 + 1;
        let date = now.date_naive();

        for seq in candidate_sequences(first_seq) {
            let code = format_order_code(input.order_type, date, vendor.id, seq);
            let active = orders::ActiveModel {
                vendor_id: Set(vendor.id),
                customer_chat_id: Set(input.customer_chat_id),
                customer_name: Set(non_blank(input.customer_name.clone())),
                asset: Set(asset.clone()),
                order_type: Set(input.order_type.as_str().to_string()),
                amount: Set(input.amount),
                rate: Set(rate),
                total_value: Set(orders::total_value(input.amount, rate)),
                status: Set(OrderStatus::Pending.as_str().to_string()),
                order_code: Set(code.clone()),
                auto_expire_at: Set(Some(now + Duration::minutes(expire_minutes))),
                rejection_reason: Set(None),
                acceptance_note: Set(None),
                pay_instructions: Set(None),
                send_instructions: Set(None),
                accepted_at: Set(None),
                declined_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            match active.insert(self.ctx.db.as_ref()).await {
                Ok(order) => {
                    tracing::info!(order_id = order.id, vendor_id = vendor.id, "order {} created", order.order_code);
                    self.notifications
                        .notify_vendor(
                            vendor.id,
                            "New pending order",
                            &format!(
                                "{} {} {} at ₦{} (order {}).",
                                input.order_type.label(),
                                format_amount(order.amount),
                                order.asset,
                                format_money(order.rate),
                                order.order_code
                            ),
                        )
                        .await;
                    return Ok(order);
                }
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!("order code {} taken, retrying", code);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(VendoraError::Conflict(
            "Could not allocate an order code. Please try again.".to_string(),
        ))
    }

    pub async fn list(
        &self,
        actor: &vendors::Model,
        filter: &OrderFilter,
    ) -> VendoraResult<(u64, Vec<orders::Model>)> {
        let mut query = orders::Entity::find().filter(orders::Column::VendorId.eq(actor.id));
        if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
            let status: OrderStatus = status.parse().map_err(VendoraError::Validation)?;
            query = query.filter(orders::Column::Status.eq(status.as_str()));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col((orders::Entity, orders::Column::OrderCode)))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col((orders::Entity, orders::Column::Asset)))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col((orders::Entity, orders::Column::CustomerName)))).like(pattern)),
            );
        }
        let ordering = filter.ordering.as_deref().unwrap_or("-created_at");
        let (field, descending) = match ordering.strip_prefix('-') {
            Some(field) => (field, true),
            None => (ordering, false),
        };
        let column = match field {
            "amount" => orders::Column::Amount,
            "total_value" => orders::Column::TotalValue,
            "status" => orders::Column::Status,
            "updated_at" => orders::Column::UpdatedAt,
            _ => orders::Column::CreatedAt,
        };
        query = if descending {
            query.order_by_desc(column).order_by_desc(orders::Column::Id)
        } else {
            query.order_by_asc(column).order_by_asc(orders::Column::Id)
        };

        let page_size = filter.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = filter.page.unwrap_or(1).max(1);
        let paginator = query.paginate(self.ctx.db.as_ref(), page_size);
        let count = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((count, items))
    }

    /// Finds an order by code (`ORD-...`, case-insensitive) or numeric id,
    /// optionally restricted to one vendor.
    pub async fn find_by_reference(
        &self,
        vendor_id: Option<i32>,
        reference: &str,
    ) -> VendoraResult<Option<orders::Model>> {
        let reference = reference.trim();
        let mut query = orders::Entity::find();
        if is_order_code(reference) {
            query = query.filter(
                Expr::expr(Func::upper(Expr::col((orders::Entity, orders::Column::OrderCode))))
                    .eq(reference.to_uppercase()),
            );
        } else if let Ok(id) = reference.trim_start_matches('#').parse::<i32>() {
            query = query.filter(orders::Column::Id.eq(id));
        } else {
            return Ok(None);
        }
        if let Some(vendor_id) = vendor_id {
            query = query.filter(orders::Column::VendorId.eq(vendor_id));
        }
        Ok(query.one(self.ctx.db.as_ref()).await?)
    }

    /// Accepts a pending order and opens its transaction.
    pub async fn accept(
        &self,
        actor: &vendors::Model,
        id: i32,
        input: AcceptOrder,
    ) -> VendoraResult<(orders::Model, transactions::Model)> {
        let order = self.get(id).await?;
        ensure_owner(actor, order.vendor_id)?;
        if !order.status().can_transition_to(OrderStatus::Accepted) {
            return Err(VendoraError::InvalidTransition(format!(
                "Only pending orders can be accepted (order is {}).",
                order.status
            )));
        }
        let vendor = self.vendors.get(order.vendor_id).await?;
        gating::check_service(&vendor, Utc::now())?;
        self.vendors.check_daily_quota(vendor.id).await?;

        let mut pay_instructions = non_blank(input.pay_instructions);
        let mut send_instructions = non_blank(input.send_instructions);
        if pay_instructions.is_none() && send_instructions.is_none() {
            let rate = rates::Entity::find()
                .filter(rates::Column::VendorId.eq(vendor.id))
                .filter(rates::Column::Asset.eq(order.asset.as_str()))
                .one(self.ctx.db.as_ref())
                .await?;
            match order.order_type() {
                OrderType::Buy => {
                    pay_instructions = match self.vendors.default_bank_detail(vendor.id).await? {
                        Some(bank) => Some(bank.as_instructions()),
                        None => rate
                            .and_then(|r| r.bank_details)
                            .or(vendor.bank_details.clone())
                            .filter(|s| !s.trim().is_empty()),
                    };
                }
                OrderType::Sell => {
                    send_instructions = rate
                        .and_then(|r| r.contract_address)
                        .filter(|s| !s.trim().is_empty());
                }
            }
        }

        if let Some(txn) = self.transactions.for_order(order.id).await? {
            if txn.status().is_locked() {
                return Err(VendoraError::InvalidTransition(format!(
                    "Order transaction is already {}.",
                    txn.status
                )));
            }
        }

        let now = Utc::now();
        let claimed = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(OrderStatus::Accepted.as_str()))
            .col_expr(orders::Column::AcceptanceNote, Expr::value(non_blank(input.acceptance_note)))
            .col_expr(orders::Column::PayInstructions, Expr::value(pay_instructions))
            .col_expr(orders::Column::SendInstructions, Expr::value(send_instructions))
            .col_expr(orders::Column::AcceptedAt, Expr::value(Some(now)))
            .col_expr(orders::Column::AutoExpireAt, Expr::value(Option::<DateTime<Utc>>::None))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::Status.eq(OrderStatus::Pending.as_str()))
            .exec(self.ctx.db.as_ref())
            .await?;
        if claimed.rows_affected == 0 {
            return Err(VendoraError::InvalidTransition(
                "Order is no longer pending.".to_string(),
            ));
        }
        let order = self.get(order.id).await?;

        let txn = self
            .transactions
            .ensure(order.id, TransactionStatus::Uncompleted, &[])
            .await?;
        self.vendors.increment_daily_orders(vendor.id).await?;
        tracing::info!(order_id = order.id, "order {} accepted", order.order_code);

        self.notify_accepted(&order).await;
        Ok((order, txn))
    }

    async fn notify_accepted(&self, order: &orders::Model) {
        let Some(chat_id) = order.customer_chat_id else {
            return;
        };
        let text = OrderAcceptedMessage {
            order_code: &order.order_code,
            asset: &order.asset,
            order_type: order.order_type().label(),
            amount: format_amount(order.amount),
            rate: format_money(order.rate),
            total: format_money(order.total_value),
            pay_instructions: order.pay_instructions.as_deref(),
            send_instructions: order.send_instructions.as_deref(),
            note: order.acceptance_note.as_deref(),
        }
        .render()
        .unwrap_or_else(|_| format!("✅ Order {} accepted", order.order_code));
        let keyboard = vec![
            vec![Button::callback("📤 Upload Payment Proof", format!("cont_upload_{}", order.id))],
            vec![Button::callback("🏦 Enter Receiving Details", format!("cont_recv_{}", order.id))],
        ];
        send_best_effort(
            self.ctx.telegram.as_ref(),
            OutboundMessage::text(chat_id, text).with_keyboard(keyboard),
        )
        .await;
    }

    pub async fn decline(
        &self,
        actor: &vendors::Model,
        id: i32,
        rejection_reason: Option<String>,
    ) -> VendoraResult<(orders::Model, transactions::Model)> {
        let order = self.get(id).await?;
        ensure_owner(actor, order.vendor_id)?;
        let reason = non_blank(rejection_reason)
            .ok_or_else(|| VendoraError::validation("Rejection reason is required"))?;
        if !order.status().can_transition_to(OrderStatus::Declined) {
            return Err(VendoraError::InvalidTransition(format!(
                "Only pending orders can be declined (order is {}).",
                order.status
            )));
        }
        let now = Utc::now();
        let claimed = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(OrderStatus::Declined.as_str()))
            .col_expr(orders::Column::RejectionReason, Expr::value(Some(reason.clone())))
            .col_expr(orders::Column::DeclinedAt, Expr::value(Some(now)))
            .col_expr(orders::Column::AutoExpireAt, Expr::value(Option::<DateTime<Utc>>::None))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::Status.eq(OrderStatus::Pending.as_str()))
            .exec(self.ctx.db.as_ref())
            .await?;
        if claimed.rows_affected == 0 {
            return Err(VendoraError::InvalidTransition(
                "Order is no longer pending.".to_string(),
            ));
        }
        let order = self.get(order.id).await?;

        let txn = self
            .transactions
            .ensure(order.id, TransactionStatus::Declined, &[TransactionStatus::Uncompleted])
            .await?;
        tracing::info!(order_id = order.id, "order {} declined", order.order_code);

        if let Some(chat_id) = order.customer_chat_id {
            let text = OrderDeclinedMessage {
                order_code: &order.order_code,
                reason: &reason,
            }
            .render()
            .unwrap_or_else(|_| format!("❌ Order {} declined.", order.order_code));
            send_best_effort(self.ctx.telegram.as_ref(), OutboundMessage::text(chat_id, text)).await;
        }
        Ok((order, txn))
    }

    /// Expires pending orders past their deadline. The status flip is a
    /// conditional update, so an order racing with accept or another sweep
    /// is claimed (and its customer notified) exactly once.
    pub async fn expire_overdue(&self, vendor_id: Option<i32>, now: DateTime<Utc>) -> VendoraResult<SweepReport> {
        let mut query = orders::Entity::find()
            .filter(orders::Column::Status.eq(OrderStatus::Pending.as_str()))
            .filter(orders::Column::AutoExpireAt.is_not_null())
            .filter(orders::Column::AutoExpireAt.lt(now));
        if let Some(vendor_id) = vendor_id {
            query = query.filter(orders::Column::VendorId.eq(vendor_id));
        }
        let overdue = query.all(self.ctx.db.as_ref()).await?;

        let mut report = SweepReport::default();
        for order in overdue {
            let claimed = orders::Entity::update_many()
                .col_expr(orders::Column::Status, Expr::value(OrderStatus::Expired.as_str()))
                .col_expr(orders::Column::AutoExpireAt, Expr::value(Option::<DateTime<Utc>>::None))
                .col_expr(orders::Column::UpdatedAt, Expr::value(now))
                .filter(orders::Column::Id.eq(order.id))
                .filter(orders::Column::Status.eq(OrderStatus::Pending.as_str()))
                .exec(self.ctx.db.as_ref())
                .await?;
            if claimed.rows_affected == 0 {
                continue;
            }
            report.expired += 1;
            if let Err(e) = self
                .transactions
                .ensure(order.id, TransactionStatus::Expired, &[TransactionStatus::Uncompleted])
                .await
            {
                tracing::warn!(order_id = order.id, "could not mark transaction expired: {}", e);
            }
            if let Some(chat_id) = order.customer_chat_id {
                let sent = send_best_effort(
                    self.ctx.telegram.as_ref(),
                    OutboundMessage::text(chat_id, format!("⏰ Order {} has expired.", order.order_code)),
                )
                .await;
                if sent {
                    report.notified += 1;
                }
            }
        }
        if report.expired > 0 {
            tracing::info!(expired = report.expired, "expired overdue orders");
        }
        Ok(report)
    }

    /// Pending orders across all vendors, for metrics.
    pub async fn count_open(&self) -> VendoraResult<u64> {
        Ok(orders::Entity::find()
            .filter(orders::Column::Status.is_in([OrderStatus::Pending.as_str(), OrderStatus::Accepted.as_str()]))
            .count(self.ctx.db.as_ref())
            .await?)
    }

    /// Latest order and transaction modification times for a vendor.
    pub async fn change_markers(
        &self,
        vendor_id: i32,
    ) -> VendoraResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let latest_order = orders::Entity::find()
            .filter(orders::Column::VendorId.eq(vendor_id))
            .order_by_desc(orders::Column::UpdatedAt)
            .one(self.ctx.db.as_ref())
            .await?
            .map(|o| o.updated_at);
        let latest_txn = transactions::Entity::find()
            .find_also_related(orders::Entity)
            .filter(orders::Column::VendorId.eq(vendor_id))
            .order_by_desc(transactions::Column::UpdatedAt)
            .one(self.ctx.db.as_ref())
            .await?
            .map(|(t, _)| t.updated_at);
        Ok((latest_order, latest_txn))
    }
}
