//! Closed vocabularies stored as strings in the database.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("\"{}\" is not a valid choice.", other)),
                }
            }
        }
    };
}

string_enum!(OrderType {
    Buy => "buy",
    Sell => "sell",
});

string_enum!(
    /// `pending -> {accepted, declined, expired}`, `accepted -> completed`.
    OrderStatus {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
        Expired => "expired",
        Completed => "completed",
    }
);

string_enum!(TransactionStatus {
    Uncompleted => "uncompleted",
    Completed => "completed",
    Declined => "declined",
    Expired => "expired",
});

string_enum!(Plan {
    Trial => "trial",
    Monthly => "monthly",
    Yearly => "yearly",
    Perpetual => "perpetual",
    None => "none",
});

string_enum!(QueryStatus {
    Pending => "pending",
    Replied => "replied",
    Resolved => "resolved",
});

string_enum!(BroadcastType {
    AssetAdded => "asset_added",
    RateUpdated => "rate_updated",
    OrderStatus => "order_status",
    General => "general",
});

string_enum!(NoticeKind {
    TrialEnding => "trial_ending",
    TrialExpired => "trial_expired",
    PlanEnding => "plan_ending",
    PlanExpired => "plan_expired",
});

string_enum!(PaymentRequestStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

impl OrderType {
    /// Two-digit segment used inside order codes.
    pub fn code_segment(&self) -> &'static str {
        match self {
            OrderType::Buy => "01",
            OrderType::Sell => "02",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Buy => "Buy",
            OrderType::Sell => "Sell",
        }
    }
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Declined | OrderStatus::Expired | OrderStatus::Completed)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Accepted)
                | (OrderStatus::Pending, OrderStatus::Declined)
                | (OrderStatus::Pending, OrderStatus::Expired)
                | (OrderStatus::Accepted, OrderStatus::Completed)
        )
    }
}

impl TransactionStatus {
    /// Declined and expired transactions are read-only.
    pub fn is_locked(&self) -> bool {
        matches!(self, TransactionStatus::Declined | TransactionStatus::Expired)
    }
}

impl Plan {
    pub fn is_paid(&self) -> bool {
        matches!(self, Plan::Monthly | Plan::Yearly)
    }

    pub fn default_duration_days(&self) -> Option<i64> {
        match self {
            Plan::Monthly => Some(30),
            Plan::Yearly => Some(365),
            _ => None,
        }
    }
}
