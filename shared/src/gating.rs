//! Subscription and availability policy for vendors.
//!
//! Every path that creates or accepts an order goes through
//! [`check_service`]; the free plan quota is checked separately on accept
//! because it depends on the vendor's running daily counter.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::Plan;
use crate::entity::vendors;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    ServiceInactive,
    TrialExpired,
    PlanExpired,
    Unavailable(Option<String>),
    DailyLimitReached { limit: i32 },
}

impl GateDenial {
    /// Text returned to the vendor by the REST API.
    pub fn vendor_message(&self) -> String {
        match self {
            GateDenial::ServiceInactive => {
                "Your service is inactive. Please upgrade your plan to continue.".to_string()
            }
            GateDenial::TrialExpired => {
                "Your free trial has expired. Please upgrade your plan to continue.".to_string()
            }
            GateDenial::PlanExpired => {
                "Your subscription has expired. Please renew your plan to continue.".to_string()
            }
            GateDenial::Unavailable(_) => "You are currently marked as unavailable.".to_string(),
            GateDenial::DailyLimitReached { limit } => format!(
                "You have reached the free plan limit of {} orders today, so you can't take any more orders until tomorrow. Upgrade your plan to remove the limit.",
                limit
            ),
        }
    }

    /// Text sent to the customer in the bot.
    pub fn customer_message(&self) -> String {
        match self {
            GateDenial::ServiceInactive => {
                "Vendor service inactive. Please contact the vendor.".to_string()
            }
            GateDenial::TrialExpired => "Vendor trial expired. Please contact the vendor.".to_string(),
            GateDenial::PlanExpired => {
                "Vendor subscription expired. Please contact the vendor.".to_string()
            }
            GateDenial::Unavailable(message) => message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or("The vendor is currently unavailable. Please try again later.")
                .to_string(),
            GateDenial::DailyLimitReached { .. } => {
                "This vendor can't take any more orders today. Please try again tomorrow.".to_string()
            }
        }
    }
}

/// Whether the vendor's subscription currently allows trading.
pub fn check_service(vendor: &vendors::Model, now: DateTime<Utc>) -> Result<(), GateDenial> {
    if !vendor.is_service_active {
        return Err(GateDenial::ServiceInactive);
    }
    let plan = vendor.plan();
    if plan == Plan::Trial || vendor.is_trial {
        if matches!(vendor.trial_expires_at, Some(expires) if expires <= now) {
            return Err(GateDenial::TrialExpired);
        }
    } else if plan != Plan::Perpetual
        && matches!(vendor.plan_expires_at, Some(expires) if expires <= now)
    {
        return Err(GateDenial::PlanExpired);
    }
    Ok(())
}

/// Whether the vendor accepts new orders from the bot right now.
pub fn check_availability(vendor: &vendors::Model) -> Result<(), GateDenial> {
    if vendor.is_available {
        Ok(())
    } else {
        Err(GateDenial::Unavailable(vendor.unavailable_message.clone()))
    }
}

/// Daily accept allowance; `None` means unlimited.
pub fn daily_order_limit(vendor: &vendors::Model, free_plan_limit: i32) -> Option<i32> {
    (vendor.plan() == Plan::None).then_some(free_plan_limit)
}

/// Orders accepted so far today, treating a stale counter as zero.
pub fn orders_today(vendor: &vendors::Model, today: NaiveDate) -> i32 {
    match vendor.daily_orders_date {
        Some(date) if date == today => vendor.daily_orders_count,
        _ => 0,
    }
}

pub fn check_daily_quota(
    vendor: &vendors::Model,
    today: NaiveDate,
    free_plan_limit: i32,
) -> Result<(), GateDenial> {
    match daily_order_limit(vendor, free_plan_limit) {
        Some(limit) if orders_today(vendor, today) >= limit => {
            Err(GateDenial::DailyLimitReached { limit })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn vendor(plan: &str) -> vendors::Model {
        let now = Utc::now();
        vendors::Model {
            id: 1,
            email: "v@example.com".to_string(),
            name: "Ada".to_string(),
            password_hash: String::new(),
            telegram_username: None,
            bio: None,
            bank_details: None,
            external_vendor_id: None,
            auto_expire_minutes: None,
            auto_accept: false,
            is_available: true,
            unavailable_message: None,
            is_staff: false,
            is_active: true,
            is_trial: plan == "trial",
            trial_started_at: Some(now),
            trial_expires_at: Some(now + Duration::days(7)),
            plan: plan.to_string(),
            plan_expires_at: None,
            is_service_active: true,
            daily_orders_count: 0,
            daily_orders_date: None,
            created_at: now,
        }
    }

    #[test]
    fn inactive_service_wins_over_everything() {
        let mut v = vendor("perpetual");
        v.is_service_active = false;
        assert_eq!(check_service(&v, Utc::now()), Err(GateDenial::ServiceInactive));
    }

    #[test]
    fn trial_expiry_is_enforced() {
        let mut v = vendor("trial");
        let now = Utc::now();
        assert!(check_service(&v, now).is_ok());
        v.trial_expires_at = Some(now - Duration::minutes(1));
        assert_eq!(check_service(&v, now), Err(GateDenial::TrialExpired));
    }

    #[test]
    fn paid_plan_expiry_is_enforced_but_perpetual_is_not() {
        let now = Utc::now();
        let mut monthly = vendor("monthly");
        monthly.plan_expires_at = Some(now - Duration::hours(1));
        assert_eq!(check_service(&monthly, now), Err(GateDenial::PlanExpired));

        let mut perpetual = vendor("perpetual");
        perpetual.plan_expires_at = Some(now - Duration::hours(1));
        assert!(check_service(&perpetual, now).is_ok());
    }

    #[test]
    fn free_plan_quota_resets_on_new_day() {
        let today = Utc::now().date_naive();
        let mut v = vendor("none");
        v.daily_orders_count = 10;
        v.daily_orders_date = Some(today);
        let denial = check_daily_quota(&v, today, 10).unwrap_err();
        assert!(denial.vendor_message().contains("can't take any more orders"));

        v.daily_orders_date = today.pred_opt();
        assert!(check_daily_quota(&v, today, 10).is_ok());
        assert_eq!(orders_today(&v, today), 0);
    }

    #[test]
    fn paid_plans_have_no_daily_limit() {
        let today = Utc::now().date_naive();
        let mut v = vendor("monthly");
        v.daily_orders_count = 500;
        v.daily_orders_date = Some(today);
        assert_eq!(daily_order_limit(&v, 10), None);
        assert!(check_daily_quota(&v, today, 10).is_ok());
    }

    #[test]
    fn unavailable_uses_vendor_message() {
        let mut v = vendor("trial");
        v.is_available = false;
        v.unavailable_message = Some("Back at 6pm".to_string());
        let denial = check_availability(&v).unwrap_err();
        assert_eq!(denial.customer_message(), "Back at 6pm");
    }
}
