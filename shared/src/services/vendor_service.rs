use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, IntoActiveModel, QueryOrder, Set};
use std::sync::OnceLock;

use super::ServiceContext;
use crate::domain::{OrderStatus, Plan, TransactionStatus};
use crate::entity::{bank_details, orders, transactions, vendors};
use crate::error::{is_unique_violation, VendoraError, VendoraResult};
use crate::gating;
use crate::models::{BankDetailInput, SubscriptionStatus, TrustStats, VendorUpdate};
use crate::repositories::VendorRepository;

const TRUST_STATS_TTL: std::time::Duration = std::time::Duration::from_secs(300);

pub struct VendorService {
    ctx: ServiceContext,
    repo: VendorRepository,
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
}

/// Normalises free text into a vendor code: `[a-z0-9_-]`, 3 to 64 chars.
pub fn make_vendor_code(text: &str, fallback: &str) -> String {
    let mut base: String = text
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if base.is_empty() {
        base = fallback.to_string();
    }
    base.truncate(64);
    if base.len() < 3 {
        base = format!("{}{}", base, fallback).chars().take(3).collect();
    }
    base
}

impl VendorService {
    pub fn new(ctx: ServiceContext) -> Self {
        let repo = VendorRepository::new(ctx.db.clone());
        Self { ctx, repo }
    }

    pub fn repo(&self) -> &VendorRepository {
        &self.repo
    }

    pub async fn get(&self, id: i32) -> VendoraResult<vendors::Model> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| VendoraError::not_found("Vendor"))
    }

    pub async fn resolve(&self, token: &str) -> VendoraResult<Option<vendors::Model>> {
        Ok(self.repo.resolve(token).await?)
    }

    /// Creates a vendor on a fresh trial.
    pub async fn signup(&self, email: &str, name: &str, password: &str) -> VendoraResult<vendors::Model> {
        let email = email.trim().to_lowercase();
        if !email_pattern().is_match(&email) {
            return Err(VendoraError::validation("Enter a valid email address."));
        }
        if name.trim().is_empty() {
            return Err(VendoraError::validation("Name is required."));
        }
        if password.chars().count() < 8 {
            return Err(VendoraError::validation("Password must be at least 8 characters long."));
        }
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(VendoraError::Conflict("A vendor with this email already exists.".to_string()));
        }

        let password_hash = bcrypt::hash(password, self.ctx.config.password_hash_cost)
            .map_err(|e| VendoraError::Internal(format!("password hashing failed: {}", e)))?;
        let now = Utc::now();
        let active = vendors::ActiveModel {
            email: Set(email.clone()),
            name: Set(name.trim().to_string()),
            password_hash: Set(password_hash),
            telegram_username: Set(None),
            bio: Set(None),
            bank_details: Set(None),
            external_vendor_id: Set(None),
            auto_expire_minutes: Set(None),
            auto_accept: Set(false),
            is_available: Set(true),
            unavailable_message: Set(None),
            is_staff: Set(false),
            is_active: Set(true),
            is_trial: Set(true),
            trial_started_at: Set(Some(now)),
            trial_expires_at: Set(Some(now + Duration::days(self.ctx.config.trial_days))),
            plan: Set(Plan::Trial.as_str().to_string()),
            plan_expires_at: Set(None),
            is_service_active: Set(true),
            daily_orders_count: Set(0),
            daily_orders_date: Set(None),
            created_at: Set(now),
            ..Default::default()
        };
        let vendor = match self.repo.create(active).await {
            Ok(v) => v,
            Err(e) if is_unique_violation(&e) => {
                return Err(VendoraError::Conflict("A vendor with this email already exists.".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(vendor_id = vendor.id, "vendor signed up, trial until {:?}", vendor.trial_expires_at);
        Ok(vendor)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> VendoraResult<vendors::Model> {
        let invalid = || VendoraError::Validation("No active account found with the given credentials".to_string());
        let vendor = self.repo.find_by_email(email).await?.ok_or_else(invalid)?;
        if !vendor.is_active {
            return Err(invalid());
        }
        match bcrypt::verify(password, &vendor.password_hash) {
            Ok(true) => Ok(vendor),
            _ => Err(invalid()),
        }
    }

    pub async fn update_profile(&self, vendor_id: i32, patch: VendorUpdate) -> VendoraResult<vendors::Model> {
        let vendor = self.get(vendor_id).await?;
        let mut active = vendor.into_active_model();
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(VendoraError::validation("Name may not be blank."));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(handle) = patch.telegram_username {
            let handle = handle.trim().trim_start_matches('@').to_string();
            active.telegram_username = Set((!handle.is_empty()).then_some(handle));
        }
        if let Some(bio) = patch.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(bank) = patch.bank_details {
            active.bank_details = Set(Some(bank));
        }
        if let Some(minutes) = patch.auto_expire_minutes {
            if minutes <= 0 {
                return Err(VendoraError::validation("auto_expire_minutes must be positive."));
            }
            active.auto_expire_minutes = Set(Some(minutes));
        }
        if let Some(flag) = patch.auto_accept {
            active.auto_accept = Set(flag);
        }
        if let Some(flag) = patch.is_available {
            active.is_available = Set(flag);
        }
        if let Some(message) = patch.unavailable_message {
            active.unavailable_message = Set(Some(message));
        }
        Ok(self.repo.update(active).await?)
    }

    /// Moves a vendor onto `plan`. Re-applying the same plan refreshes its
    /// expiry, so the call is idempotent from the client's point of view.
    pub async fn set_plan(
        &self,
        vendor_id: i32,
        plan: Plan,
        duration_days: Option<i64>,
    ) -> VendoraResult<vendors::Model> {
        if matches!(duration_days, Some(d) if d <= 0) {
            return Err(VendoraError::validation("duration_days must be positive."));
        }
        let vendor = self.get(vendor_id).await?;
        let old_plan = vendor.plan();
        let now = Utc::now();
        let mut active = vendor.into_active_model();
        active.plan = Set(plan.as_str().to_string());
        active.is_trial = Set(plan == Plan::Trial);
        match plan {
            Plan::Perpetual | Plan::None | Plan::Trial => active.plan_expires_at = Set(None),
            Plan::Monthly | Plan::Yearly => {
                let days = duration_days.or(plan.default_duration_days()).unwrap_or(30);
                active.plan_expires_at = Set(Some(now + Duration::days(days)));
            }
        }
        if plan != Plan::None {
            active.is_service_active = Set(true);
        }
        let vendor = self.repo.update(active).await?;
        tracing::info!(vendor_id, "plan changed {} -> {}", old_plan, plan);
        Ok(vendor)
    }

    pub fn subscription_status(&self, vendor: &vendors::Model) -> SubscriptionStatus {
        let today = Utc::now().date_naive();
        SubscriptionStatus {
            plan: vendor.plan(),
            is_trial: vendor.is_trial,
            trial_expires_at: vendor.trial_expires_at,
            plan_expires_at: vendor.plan_expires_at,
            is_service_active: vendor.is_service_active,
            daily_order_limit: gating::daily_order_limit(vendor, self.ctx.config.free_plan_daily_order_limit),
            orders_today: gating::orders_today(vendor, today),
        }
    }

    /// Checks the free plan quota, persisting a counter reset when the day
    /// has rolled over. Returns the fresh vendor row.
    pub async fn check_daily_quota(&self, vendor_id: i32) -> VendoraResult<vendors::Model> {
        let mut vendor = self.get(vendor_id).await?;
        let today = Utc::now().date_naive();
        if vendor.daily_orders_date != Some(today) && vendor.daily_orders_count != 0 {
            let mut active = vendor.into_active_model();
            active.daily_orders_count = Set(0);
            active.daily_orders_date = Set(Some(today));
            vendor = self.repo.update(active).await?;
        }
        gating::check_daily_quota(&vendor, today, self.ctx.config.free_plan_daily_order_limit)?;
        Ok(vendor)
    }

    /// `(allowed, message)` view of the daily quota for callers that only
    /// need to display it.
    pub async fn increment_daily_orders(&self, vendor_id: i32) -> VendoraResult<()> {
        let today = Utc::now().date_naive();
        let db = self.ctx.db.as_ref();
        let bumped = vendors::Entity::update_many()
            .col_expr(
                vendors::Column::DailyOrdersCount,
                Expr::col(vendors::Column::DailyOrdersCount).add(1),
            )
            .filter(vendors::Column::Id.eq(vendor_id))
            .filter(vendors::Column::DailyOrdersDate.eq(today))
            .exec(db)
            .await?;
        if bumped.rows_affected == 0 {
            vendors::Entity::update_many()
                .col_expr(vendors::Column::DailyOrdersCount, Expr::value(1))
                .col_expr(vendors::Column::DailyOrdersDate, Expr::value(today))
                .filter(vendors::Column::Id.eq(vendor_id))
                .exec(db)
                .await?;
        }
        Ok(())
    }

    /// Turns off service for paid plans past their expiry.
    pub async fn expire_plans(&self, now: DateTime<Utc>) -> VendoraResult<u64> {
        let expired = vendors::Entity::find()
            .filter(vendors::Column::PlanExpiresAt.is_not_null())
            .filter(vendors::Column::PlanExpiresAt.lt(now))
            .filter(vendors::Column::IsServiceActive.eq(true))
            .all(self.ctx.db.as_ref())
            .await?;
        let mut count = 0;
        for vendor in expired {
            let vendor_id = vendor.id;
            let mut active = vendor.into_active_model();
            active.is_service_active = Set(false);
            active.plan = Set(Plan::None.as_str().to_string());
            active.plan_expires_at = Set(None);
            self.repo.update(active).await?;
            tracing::info!(vendor_id, "plan expired, service deactivated");
            count += 1;
        }
        Ok(count)
    }

    /// Switches off service for trial vendors whose trial has run out.
    pub async fn expire_trials(&self, now: DateTime<Utc>) -> VendoraResult<u64> {
        let result = vendors::Entity::update_many()
            .col_expr(vendors::Column::IsServiceActive, Expr::value(false))
            .filter(vendors::Column::IsTrial.eq(true))
            .filter(vendors::Column::TrialExpiresAt.is_not_null())
            .filter(vendors::Column::TrialExpiresAt.lt(now))
            .filter(vendors::Column::IsServiceActive.eq(true))
            .exec(self.ctx.db.as_ref())
            .await?;
        if result.rows_affected > 0 {
            tracing::info!(count = result.rows_affected, "expired trials, service deactivated");
        }
        Ok(result.rows_affected)
    }

    /// Assigns a unique external code to vendors that lack one.
    pub async fn backfill_external_ids(&self, dry_run: bool) -> VendoraResult<Vec<(i32, String)>> {
        let missing = vendors::Entity::find()
            .filter(
                sea_orm::Condition::any()
                    .add(vendors::Column::ExternalVendorId.is_null())
                    .add(vendors::Column::ExternalVendorId.eq("")),
            )
            .order_by_asc(vendors::Column::Id)
            .all(self.ctx.db.as_ref())
            .await?;
        let mut changes = Vec::new();
        for vendor in missing {
            let fallback = format!("vendor{}", vendor.id);
            let source = if vendor.name.trim().is_empty() {
                vendor.email.split('@').next().unwrap_or_default().to_string()
            } else {
                vendor.name.clone()
            };
            let code = make_vendor_code(&source, &fallback);
            let mut candidate = code.clone();
            let mut idx = 1;
            while let Some(other) = self.repo.find_by_external_id(&candidate).await? {
                if other.id == vendor.id {
                    break;
                }
                let suffix = format!("-{}", idx);
                candidate = format!("{}{}", &code[..code.len().min(64 - suffix.len())], suffix);
                idx += 1;
                if idx > 50 {
                    candidate = fallback.clone();
                    break;
                }
            }
            if !dry_run {
                let vendor_id = vendor.id;
                let mut active = vendor.into_active_model();
                active.external_vendor_id = Set(Some(candidate.clone()));
                self.repo.update(active).await?;
                changes.push((vendor_id, candidate));
            } else {
                changes.push((vendor.id, candidate));
            }
        }
        Ok(changes)
    }

    /// Deep link customers use to reach this vendor in the bot.
    pub fn bot_link(&self, vendor: &vendors::Model) -> Option<String> {
        let bot = self.ctx.config.bot_username.as_deref()?;
        let code = vendor
            .external_vendor_id
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| vendor.id.to_string());
        Some(format!("https://t.me/{}?start=vendor_{}", bot, code))
    }

    /// Completed trade count and typical release time, cached for five minutes.
    pub async fn trust_stats(&self, vendor_id: i32) -> VendoraResult<TrustStats> {
        let key = format!("vendora:trust:{}", vendor_id);
        if let Ok(Some(cached)) = self.ctx.cache.get(&key).await {
            if let Ok(stats) = serde_json::from_str::<TrustStats>(&cached) {
                return Ok(stats);
            }
        }

        let completed: Vec<(orders::Model, Option<transactions::Model>)> = orders::Entity::find()
            .filter(orders::Column::VendorId.eq(vendor_id))
            .filter(orders::Column::Status.eq(OrderStatus::Completed.as_str()))
            .find_also_related(transactions::Entity)
            .all(self.ctx.db.as_ref())
            .await?;
        let mut minutes: Vec<i64> = completed
            .iter()
            .filter_map(|(order, txn)| {
                let txn = txn.as_ref().filter(|t| t.status() == TransactionStatus::Completed)?;
                let done = txn.vendor_completed_at.or(txn.completed_at)?;
                let start = order.accepted_at.unwrap_or(order.created_at);
                Some((done - start).num_minutes().max(0))
            })
            .collect();
        minutes.sort_unstable();
        let stats = TrustStats {
            completed_trades: completed.len() as u64,
            typical_release_minutes: minutes.get(minutes.len() / 2).copied(),
        };

        if let Ok(json) = serde_json::to_string(&stats) {
            if let Err(e) = self.ctx.cache.set(&key, &json, TRUST_STATS_TTL).await {
                tracing::debug!("trust stats cache write failed: {}", e);
            }
        }
        Ok(stats)
    }

    pub async fn list_bank_details(&self, vendor_id: i32) -> VendoraResult<Vec<bank_details::Model>> {
        Ok(bank_details::Entity::find()
            .filter(bank_details::Column::VendorId.eq(vendor_id))
            .order_by_desc(bank_details::Column::IsDefault)
            .order_by_desc(bank_details::Column::CreatedAt)
            .all(self.ctx.db.as_ref())
            .await?)
    }

    /// Preferred bank account for BUY instructions.
    pub async fn default_bank_detail(&self, vendor_id: i32) -> VendoraResult<Option<bank_details::Model>> {
        Ok(self.list_bank_details(vendor_id).await?.into_iter().next())
    }

    pub async fn add_bank_detail(&self, vendor_id: i32, input: BankDetailInput) -> VendoraResult<bank_details::Model> {
        for (field, value) in [
            ("bank_name", &input.bank_name),
            ("account_number", &input.account_number),
            ("account_name", &input.account_name),
        ] {
            if value.trim().is_empty() {
                return Err(VendoraError::validation(format!("{} may not be blank.", field)));
            }
        }
        if input.is_default {
            self.clear_default_bank(vendor_id).await?;
        }
        let active = bank_details::ActiveModel {
            vendor_id: Set(vendor_id),
            bank_name: Set(input.bank_name.trim().to_string()),
            account_number: Set(input.account_number.trim().to_string()),
            account_name: Set(input.account_name.trim().to_string()),
            instructions: Set(input.instructions),
            is_default: Set(input.is_default),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(active.insert(self.ctx.db.as_ref()).await?)
    }

    pub async fn set_default_bank_detail(&self, vendor_id: i32, id: i32) -> VendoraResult<bank_details::Model> {
        let detail = self.own_bank_detail(vendor_id, id).await?;
        self.clear_default_bank(vendor_id).await?;
        let mut active = detail.into_active_model();
        active.is_default = Set(true);
        Ok(active.update(self.ctx.db.as_ref()).await?)
    }

    pub async fn delete_bank_detail(&self, vendor_id: i32, id: i32) -> VendoraResult<()> {
        let detail = self.own_bank_detail(vendor_id, id).await?;
        bank_details::Entity::delete_by_id(detail.id)
            .exec(self.ctx.db.as_ref())
            .await?;
        Ok(())
    }

    async fn own_bank_detail(&self, vendor_id: i32, id: i32) -> VendoraResult<bank_details::Model> {
        bank_details::Entity::find_by_id(id)
            .filter(bank_details::Column::VendorId.eq(vendor_id))
            .one(self.ctx.db.as_ref())
            .await?
            .ok_or_else(|| VendoraError::not_found("Bank detail"))
    }

    async fn clear_default_bank(&self, vendor_id: i32) -> VendoraResult<()> {
        bank_details::Entity::update_many()
            .col_expr(bank_details::Column::IsDefault, Expr::value(false))
            .filter(bank_details::Column::VendorId.eq(vendor_id))
            .exec(self.ctx.db.as_ref())
            .await?;
        Ok(())
    }
}
