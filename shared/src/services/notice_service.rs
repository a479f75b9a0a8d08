use chrono::{DateTime, Duration, Utc};
use sea_orm::prelude::*;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;

use super::{NotificationService, ServiceContext};
use crate::domain::{NoticeKind, Plan};
use crate::entity::{notification_logs, vendors};
use crate::error::{is_unique_violation, VendoraResult};

pub const NOTICE_WINDOW_DAYS: i64 = 3;

/// Which notice, if any, a vendor is due at `now`.
pub fn due_notice(vendor: &vendors::Model, now: DateTime<Utc>) -> Option<(NoticeKind, i64)> {
    let soon = now + Duration::days(NOTICE_WINDOW_DAYS);
    let days_left = |at: DateTime<Utc>| (at - now).num_days().max(1);
    if vendor.is_trial {
        let expires = vendor.trial_expires_at?;
        if expires < now {
            Some((NoticeKind::TrialExpired, 0))
        } else if expires <= soon {
            Some((NoticeKind::TrialEnding, days_left(expires)))
        } else {
            None
        }
    } else if matches!(vendor.plan(), Plan::Monthly | Plan::Yearly) {
        let expires = vendor.plan_expires_at?;
        if expires < now {
            Some((NoticeKind::PlanExpired, 0))
        } else if expires <= soon {
            Some((NoticeKind::PlanEnding, days_left(expires)))
        } else {
            None
        }
    } else {
        None
    }
}

fn notice_text(kind: NoticeKind, days_left: i64) -> (&'static str, String) {
    match kind {
        NoticeKind::TrialEnding => (
            "Your trial is ending soon",
            format!("Your free trial ends in {} day(s). Upgrade to keep taking orders.", days_left),
        ),
        NoticeKind::TrialExpired => (
            "Your trial has expired",
            "Your free trial has ended. Upgrade your plan to continue taking orders.".to_string(),
        ),
        NoticeKind::PlanEnding => (
            "Your plan is expiring soon",
            format!("Your subscription expires in {} day(s). Renew to avoid interruption.", days_left),
        ),
        NoticeKind::PlanExpired => (
            "Your plan has expired",
            "Your subscription has expired. Renew your plan to continue taking orders.".to_string(),
        ),
    }
}

/// Trial and plan expiry notices, sent at most once per vendor and kind.
pub struct AccountNoticeService {
    ctx: ServiceContext,
    notifications: Arc<NotificationService>,
}

impl AccountNoticeService {
    pub fn new(ctx: ServiceContext, notifications: Arc<NotificationService>) -> Self {
        Self { ctx, notifications }
    }

    pub async fn send_account_notices(&self, now: DateTime<Utc>) -> VendoraResult<u64> {
        let vendors = vendors::Entity::find()
            .filter(vendors::Column::IsActive.eq(true))
            .all(self.ctx.db.as_ref())
            .await?;
        let mut sent = 0;
        for vendor in vendors {
            let Some((kind, days_left)) = due_notice(&vendor, now) else {
                continue;
            };
            // The unique (vendor, kind) index is the idempotency guard
            let logged = notification_logs::ActiveModel {
                vendor_id: Set(vendor.id),
                kind: Set(kind.as_str().to_string()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(self.ctx.db.as_ref())
            .await;
            match logged {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => continue,
                Err(e) => return Err(e.into()),
            }
            let (title, message) = notice_text(kind, days_left);
            self.notifications.notify_vendor(vendor.id, title, &message).await;
            tracing::info!(vendor_id = vendor.id, "account notice {} sent to {}", kind, vendor.email);
            sent += 1;
        }
        Ok(sent)
    }
}
