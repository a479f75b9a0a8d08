use askama::Template;
use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, IntoActiveModel, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;

use super::{NotificationService, ServiceContext};
use crate::domain::{OrderStatus, TransactionStatus};
use crate::entity::{orders, transactions, vendors};
use crate::error::{is_unique_violation, VendoraError, VendoraResult};
use crate::media;
use crate::models::Upload;
use crate::telegram::{send_best_effort, Button, OutboundMessage};
use crate::templates::{format_amount, format_money, TransactionCompletedMessage};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPatch {
    pub customer_receiving_details: Option<String>,
    pub customer_note: Option<String>,
}

pub struct TransactionService {
    ctx: ServiceContext,
    notifications: Arc<NotificationService>,
}

pub(crate) fn ensure_owner(actor: &vendors::Model, vendor_id: i32) -> VendoraResult<()> {
    if actor.is_staff || actor.id == vendor_id {
        Ok(())
    } else {
        Err(VendoraError::Forbidden)
    }
}

impl TransactionService {
    pub fn new(ctx: ServiceContext, notifications: Arc<NotificationService>) -> Self {
        Self { ctx, notifications }
    }

    pub async fn for_order(&self, order_id: i32) -> VendoraResult<Option<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::OrderId.eq(order_id))
            .one(self.ctx.db.as_ref())
            .await?)
    }

    /// Inserts the single transaction an order may have.
    pub async fn create(&self, order_id: i32, status: TransactionStatus) -> VendoraResult<transactions::Model> {
        let now = Utc::now();
        let active = transactions::ActiveModel {
            order_id: Set(order_id),
            proof: Set(None),
            proof_uploaded_at: Set(None),
            status: Set(status.as_str().to_string()),
            completed_at: Set(None),
            customer_receiving_details: Set(None),
            customer_note: Set(None),
            vendor_proof: Set(None),
            vendor_completed_at: Set(None),
            vendor_notified: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        match active.insert(self.ctx.db.as_ref()).await {
            Ok(txn) => Ok(txn),
            Err(e) if is_unique_violation(&e) => Err(VendoraError::Conflict(
                "A transaction already exists for this order.".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Finds or creates the order's transaction. An existing row whose
    /// status is listed in `overwrite` is moved to `desired`.
    pub async fn ensure(
        &self,
        order_id: i32,
        desired: TransactionStatus,
        overwrite: &[TransactionStatus],
    ) -> VendoraResult<transactions::Model> {
        let existing = match self.for_order(order_id).await? {
            Some(txn) => txn,
            None => match self.create(order_id, desired).await {
                Ok(txn) => return Ok(txn),
                // Lost the insert race; fall through to the winner's row
                Err(VendoraError::Conflict(_)) => self
                    .for_order(order_id)
                    .await?
                    .ok_or_else(|| VendoraError::not_found("Transaction"))?,
                Err(e) => return Err(e),
            },
        };
        if existing.status() != desired && overwrite.contains(&existing.status()) {
            let mut active = existing.into_active_model();
            active.status = Set(desired.as_str().to_string());
            active.updated_at = Set(Utc::now());
            return Ok(active.update(self.ctx.db.as_ref()).await?);
        }
        Ok(existing)
    }

    pub async fn get_for_vendor(
        &self,
        actor: &vendors::Model,
        id: i32,
    ) -> VendoraResult<(transactions::Model, orders::Model)> {
        let (txn, order) = transactions::Entity::find_by_id(id)
            .find_also_related(orders::Entity)
            .one(self.ctx.db.as_ref())
            .await?
            .ok_or_else(|| VendoraError::not_found("Transaction"))?;
        let order = order.ok_or_else(|| VendoraError::not_found("Order"))?;
        if ensure_owner(actor, order.vendor_id).is_err() {
            return Err(VendoraError::not_found("Transaction"));
        }
        Ok((txn, order))
    }

    pub async fn list(
        &self,
        actor: &vendors::Model,
        status: Option<&str>,
    ) -> VendoraResult<Vec<(transactions::Model, orders::Model)>> {
        let mut query = transactions::Entity::find()
            .find_also_related(orders::Entity)
            .filter(orders::Column::VendorId.eq(actor.id));
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            let status: TransactionStatus = status.parse().map_err(VendoraError::Validation)?;
            query = query.filter(transactions::Column::Status.eq(status.as_str()));
        }
        let rows = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .all(self.ctx.db.as_ref())
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(txn, order)| order.map(|o| (txn, o)))
            .collect())
    }

    pub async fn update(
        &self,
        actor: &vendors::Model,
        id: i32,
        patch: TransactionPatch,
    ) -> VendoraResult<transactions::Model> {
        let (txn, _) = self.get_for_vendor(actor, id).await?;
        if txn.status().is_locked() {
            return Err(VendoraError::validation(format!(
                "Transaction is {} and can no longer be changed.",
                txn.status
            )));
        }
        let mut active = txn.into_active_model();
        if let Some(details) = patch.customer_receiving_details {
            active.customer_receiving_details = Set(Some(details));
        }
        if let Some(note) = patch.customer_note {
            active.customer_note = Set(Some(note));
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.ctx.db.as_ref()).await?)
    }

    /// Vendor finalises a trade as completed or declined.
    pub async fn complete(
        &self,
        actor: &vendors::Model,
        id: i32,
        status: &str,
        proof: Option<Upload>,
    ) -> VendoraResult<transactions::Model> {
        let (txn, order) = self.get_for_vendor(actor, id).await?;
        if txn.status().is_locked() {
            return Err(VendoraError::validation(format!(
                "Transaction is {} and cannot be completed.",
                txn.status
            )));
        }
        let status = match status.parse::<TransactionStatus>() {
            Ok(s @ (TransactionStatus::Completed | TransactionStatus::Declined)) => s,
            _ => return Err(VendoraError::validation("Invalid status")),
        };

        let now = Utc::now();
        let mut active = txn.into_active_model();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(now);
        let mut proof_path = None;
        if let Some(upload) = proof {
            let relative = media::save(
                &self.ctx.config.media_root,
                media::VENDOR_PROOFS_DIR,
                &upload.file_name,
                &upload.bytes,
            )
            .await
            .map_err(|e| VendoraError::Internal(format!("could not store proof: {}", e)))?;
            active.vendor_proof = Set(Some(relative.clone()));
            proof_path = Some(relative);
        }
        if status == TransactionStatus::Completed {
            active.completed_at = Set(Some(now));
            active.vendor_completed_at = Set(Some(now));
        }
        let txn = active.update(self.ctx.db.as_ref()).await?;

        if status == TransactionStatus::Completed {
            orders::Entity::update_many()
                .col_expr(orders::Column::Status, Expr::value(OrderStatus::Completed.as_str()))
                .col_expr(orders::Column::UpdatedAt, Expr::value(now))
                .filter(orders::Column::Id.eq(order.id))
                .filter(orders::Column::Status.is_in([OrderStatus::Pending.as_str(), OrderStatus::Accepted.as_str()]))
                .exec(self.ctx.db.as_ref())
                .await?;
        }
        tracing::info!(transaction_id = txn.id, order_id = order.id, "transaction marked {}", status);

        self.notify_customer_of_completion(&order, &txn, status, proof_path.as_deref())
            .await;
        Ok(txn)
    }

    async fn notify_customer_of_completion(
        &self,
        order: &orders::Model,
        txn: &transactions::Model,
        status: TransactionStatus,
        proof: Option<&str>,
    ) {
        let Some(chat_id) = order.customer_chat_id else {
            return;
        };
        let message = if status == TransactionStatus::Completed {
            let vendor_name = match vendors::Entity::find_by_id(order.vendor_id)
                .one(self.ctx.db.as_ref())
                .await
            {
                Ok(Some(v)) => v.display_name(),
                _ => "The vendor".to_string(),
            };
            let amount = format_amount(order.amount);
            let text = TransactionCompletedMessage {
                order_code: &order.order_code,
                vendor_name: &vendor_name,
                order_type: &order.order_type,
                asset: &order.asset,
                amount: amount.clone(),
                total: format_money(order.total_value),
                has_proof: proof.is_some(),
            }
            .render()
            .unwrap_or_else(|_| format!("🎉 Order {} completed!", order.order_code));
            let keyboard = vec![vec![
                Button::callback(
                    "🔁 Repeat trade",
                    format!("repeat_{}_{}_{}", order.asset, order.order_type, amount),
                ),
                Button::callback("🆕 New trade", "back_to_menu"),
            ]];
            let mut message = OutboundMessage::text(chat_id, text).with_keyboard(keyboard);
            if let Some(relative) = proof.or(txn.vendor_proof.as_deref()) {
                message = message.with_document(media::absolute(&self.ctx.config.media_root, relative));
            }
            message
        } else {
            OutboundMessage::text(
                chat_id,
                format!(
                    "❌ Your transaction for order {} was declined by the vendor. Please contact the vendor for details.",
                    order.order_code
                ),
            )
        };
        send_best_effort(self.ctx.telegram.as_ref(), message).await;
    }

    /// Stores a customer's payment proof. The order must already be
    /// accepted (or completed).
    pub async fn attach_proof(
        &self,
        order: &orders::Model,
        relative_path: &str,
    ) -> VendoraResult<transactions::Model> {
        if !matches!(order.status(), OrderStatus::Accepted | OrderStatus::Completed) {
            return Err(VendoraError::InvalidTransition(
                "The vendor hasn't accepted your order yet. Please wait for acceptance before uploading proof.".to_string(),
            ));
        }
        let txn = self
            .ensure(order.id, TransactionStatus::Uncompleted, &[])
            .await?;
        if txn.status().is_locked() {
            return Err(VendoraError::InvalidTransition(format!(
                "This transaction is {} and can no longer be updated.",
                txn.status
            )));
        }
        let now = Utc::now();
        let mut active = txn.into_active_model();
        active.proof = Set(Some(relative_path.to_string()));
        active.proof_uploaded_at = Set(Some(now));
        active.updated_at = Set(now);
        let txn = active.update(self.ctx.db.as_ref()).await?;
        self.notifications
            .notify_vendor(
                order.vendor_id,
                "Payment proof uploaded",
                &format!("Customer uploaded payment proof for order {}.", order.order_code),
            )
            .await;
        Ok(txn)
    }

    pub async fn set_receiving_details(&self, order_id: i32, details: &str) -> VendoraResult<transactions::Model> {
        let txn = self.ensure(order_id, TransactionStatus::Uncompleted, &[]).await?;
        if txn.status().is_locked() {
            return Err(VendoraError::InvalidTransition(format!(
                "This transaction is {} and can no longer be updated.",
                txn.status
            )));
        }
        let mut active = txn.into_active_model();
        active.customer_receiving_details = Set(Some(details.trim().to_string()));
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.ctx.db.as_ref()).await?)
    }

    pub async fn set_customer_note(&self, order_id: i32, note: &str) -> VendoraResult<Option<transactions::Model>> {
        let Some(txn) = self.for_order(order_id).await? else {
            return Ok(None);
        };
        if txn.status().is_locked() {
            return Ok(Some(txn));
        }
        let mut active = txn.into_active_model();
        active.customer_note = Set(Some(note.trim().to_string()));
        active.updated_at = Set(Utc::now());
        Ok(Some(active.update(self.ctx.db.as_ref()).await?))
    }

    /// Flags that the vendor has been told about this transaction. Returns
    /// false when someone already did.
    pub async fn mark_vendor_notified(&self, id: i32) -> VendoraResult<bool> {
        let result = transactions::Entity::update_many()
            .col_expr(transactions::Column::VendorNotified, Expr::value(true))
            .filter(transactions::Column::Id.eq(id))
            .filter(transactions::Column::VendorNotified.eq(false))
            .exec(self.ctx.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }
}
