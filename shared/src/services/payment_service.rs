use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::{ActiveModelTrait, IntoActiveModel, QueryOrder, Set};
use std::sync::Arc;

use super::{NotificationService, ServiceContext, VendorService};
use crate::domain::{PaymentRequestStatus, Plan};
use crate::entity::{payment_requests, vendors};
use crate::error::{VendoraError, VendoraResult};
use crate::media;
use crate::models::Upload;

/// Manual subscription payments: a vendor submits a receipt, staff approve
/// or reject it.
pub struct PaymentService {
    ctx: ServiceContext,
    vendors: Arc<VendorService>,
    notifications: Arc<NotificationService>,
}

impl PaymentService {
    pub fn new(ctx: ServiceContext, vendors: Arc<VendorService>, notifications: Arc<NotificationService>) -> Self {
        Self {
            ctx,
            vendors,
            notifications,
        }
    }

    pub async fn create(
        &self,
        vendor_id: i32,
        note: Option<String>,
        receipt: Option<Upload>,
    ) -> VendoraResult<payment_requests::Model> {
        let receipt_path = match receipt {
            Some(upload) => Some(
                media::save(&self.ctx.config.media_root, media::RECEIPTS_DIR, &upload.file_name, &upload.bytes)
                    .await
                    .map_err(|e| VendoraError::Internal(format!("could not store receipt: {}", e)))?,
            ),
            None => None,
        };
        let request = payment_requests::ActiveModel {
            vendor_id: Set(vendor_id),
            note: Set(note.filter(|n| !n.trim().is_empty())),
            receipt: Set(receipt_path),
            status: Set(PaymentRequestStatus::Pending.as_str().to_string()),
            processed_by: Set(None),
            created_at: Set(Utc::now()),
            processed_at: Set(None),
            ..Default::default()
        }
        .insert(self.ctx.db.as_ref())
        .await?;
        tracing::info!(vendor_id, request_id = request.id, "payment request submitted");
        Ok(request)
    }

    /// Requests visible to `actor`: their own, or everything for staff.
    pub async fn list(&self, actor: &vendors::Model) -> VendoraResult<Vec<payment_requests::Model>> {
        let mut query = payment_requests::Entity::find();
        if !actor.is_staff {
            query = query.filter(payment_requests::Column::VendorId.eq(actor.id));
        }
        Ok(query
            .order_by_desc(payment_requests::Column::CreatedAt)
            .order_by_desc(payment_requests::Column::Id)
            .all(self.ctx.db.as_ref())
            .await?)
    }

    pub async fn latest(&self, vendor_id: i32) -> VendoraResult<Option<payment_requests::Model>> {
        Ok(payment_requests::Entity::find()
            .filter(payment_requests::Column::VendorId.eq(vendor_id))
            .order_by_desc(payment_requests::Column::CreatedAt)
            .order_by_desc(payment_requests::Column::Id)
            .one(self.ctx.db.as_ref())
            .await?)
    }

    async fn pending(&self, id: i32) -> VendoraResult<payment_requests::Model> {
        let request = payment_requests::Entity::find_by_id(id)
            .one(self.ctx.db.as_ref())
            .await?
            .ok_or_else(|| VendoraError::not_found("Payment request"))?;
        if request.status != PaymentRequestStatus::Pending.as_str() {
            return Err(VendoraError::InvalidTransition(format!(
                "Payment request already {}.",
                request.status
            )));
        }
        Ok(request)
    }

    /// Approves a request: with `duration_days` the vendor gets a monthly
    /// plan of that length, otherwise a perpetual licence.
    pub async fn approve(
        &self,
        staff: &vendors::Model,
        id: i32,
        duration_days: Option<i64>,
    ) -> VendoraResult<(payment_requests::Model, vendors::Model)> {
        if !staff.is_staff {
            return Err(VendoraError::Forbidden);
        }
        let request = self.pending(id).await?;
        let vendor = match duration_days {
            Some(days) => self.vendors.set_plan(request.vendor_id, Plan::Monthly, Some(days)).await?,
            None => self.vendors.set_plan(request.vendor_id, Plan::Perpetual, None).await?,
        };
        let request = self.finish(request, PaymentRequestStatus::Approved, staff.id).await?;
        self.notifications
            .notify_vendor(vendor.id, "Payment approved", "Your payment was approved and your plan is active.")
            .await;
        Ok((request, vendor))
    }

    pub async fn reject(&self, staff: &vendors::Model, id: i32) -> VendoraResult<payment_requests::Model> {
        if !staff.is_staff {
            return Err(VendoraError::Forbidden);
        }
        let request = self.pending(id).await?;
        let request = self.finish(request, PaymentRequestStatus::Rejected, staff.id).await?;
        self.notifications
            .notify_vendor(
                request.vendor_id,
                "Payment rejected",
                "Your payment could not be verified. Please contact support.",
            )
            .await;
        Ok(request)
    }

    async fn finish(
        &self,
        request: payment_requests::Model,
        status: PaymentRequestStatus,
        staff_id: i32,
    ) -> VendoraResult<payment_requests::Model> {
        let mut active = request.into_active_model();
        active.status = Set(status.as_str().to_string());
        active.processed_by = Set(Some(staff_id));
        active.processed_at = Set(Some(Utc::now()));
        let request = active.update(self.ctx.db.as_ref()).await?;
        tracing::info!(request_id = request.id, "payment request {}", status);
        Ok(request)
    }
}
