//! Enumerated notification and role state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use stockflow_core::permissions;

/// Kind of event a notification reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum NotificationType {
    Info = 0,
    Success = 1,
    Warning = 2,
    Error = 3,
    StockAlert = 4,
    Invoice = 5,
    Payment = 6,
    Account = 7,
    System = 8,
    Security = 9,
    Subscription = 10,
    Product = 11,
    Report = 12,
}

impl NotificationType {
    /// All types, used when seeding default preferences.
    pub const ALL: [NotificationType; 13] = [
        NotificationType::Info,
        NotificationType::Success,
        NotificationType::Warning,
        NotificationType::Error,
        NotificationType::StockAlert,
        NotificationType::Invoice,
        NotificationType::Payment,
        NotificationType::Account,
        NotificationType::System,
        NotificationType::Security,
        NotificationType::Subscription,
        NotificationType::Product,
        NotificationType::Report,
    ];
}

/// Delivery urgency. Totally ordered: `Low < Normal < High < Critical <
/// Emergency`.
///
/// `Critical` bypasses quiet hours and batching. `Emergency` is reserved for
/// the system-wide broadcast path and skips preference gates entirely when
/// the emergency bypass flag is enabled.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum NotificationPriority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
    Emergency = 4,
}

/// Lifecycle state of a notification instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum NotificationStatus {
    Pending = 0,
    Sent = 1,
    Delivered = 2,
    Read = 3,
    Failed = 4,
    Cancelled = 5,
    Expired = 6,
}

impl NotificationStatus {
    /// Whether no further transitions are legal from this state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Read | Self::Cancelled | Self::Expired)
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Legacy scalar role carried on user rows.
///
/// This is a compatibility view computed from the canonical [`Role`] entity's
/// name, never a second source of truth. The static permission table keyed by
/// this enum backs the evaluator when no store is configured.
///
/// [`Role`]: crate::roles::Role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Manager,
    Admin,
}

impl UserRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "User",
            UserRole::Manager => "Manager",
            UserRole::Admin => "Admin",
        }
    }

    /// Compute the compatibility view from a canonical role name.
    pub fn from_role_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "user" => Some(UserRole::User),
            "manager" => Some(UserRole::Manager),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Hierarchy level; higher means more authority.
    pub const fn hierarchy_level(self) -> u8 {
        match self {
            UserRole::User => 0,
            UserRole::Manager => 1,
            UserRole::Admin => 2,
        }
    }

    /// The fixed permission set for this role, used by static-mode
    /// evaluation. Admin is a superset of Manager, which is a superset of
    /// User.
    pub fn static_permissions(self) -> HashSet<&'static str> {
        match self {
            UserRole::User => HashSet::from([
                permissions::users::VIEW,
                permissions::users::EDIT,
                permissions::product::VIEW,
                permissions::reports::VIEW_BASIC,
            ]),
            UserRole::Manager => HashSet::from([
                permissions::users::VIEW,
                permissions::users::EDIT,
                permissions::users::VIEW_ALL,
                permissions::users::VIEW_REPORTS,
                permissions::product::VIEW,
                permissions::product::CREATE,
                permissions::product::EDIT,
                permissions::product::UPDATE_STOCK,
                permissions::product::VIEW_REPORTS,
                permissions::invoice::VIEW,
                permissions::invoice::CREATE,
                permissions::invoice::EDIT,
                permissions::invoice::VIEW_ALL,
                permissions::invoice::MANAGE_ITEMS,
                permissions::system::VIEW_STATISTICS,
                permissions::reports::VIEW_BASIC,
                permissions::reports::VIEW_ADVANCED,
                permissions::reports::GENERATE,
                permissions::data::EXPORT,
            ]),
            UserRole::Admin => stockflow_core::builtin_permissions()
                .iter()
                .map(|p| p.name)
                .collect(),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering() {
        assert!(NotificationPriority::Low < NotificationPriority::Normal);
        assert!(NotificationPriority::Normal < NotificationPriority::High);
        assert!(NotificationPriority::High < NotificationPriority::Critical);
        assert!(NotificationPriority::Critical < NotificationPriority::Emergency);
    }

    #[test]
    fn terminal_statuses() {
        assert!(NotificationStatus::Read.is_terminal());
        assert!(NotificationStatus::Cancelled.is_terminal());
        assert!(NotificationStatus::Expired.is_terminal());
        assert!(!NotificationStatus::Failed.is_terminal());
        assert!(!NotificationStatus::Pending.is_terminal());
    }

    #[test]
    fn role_name_compatibility_view() {
        assert_eq!(UserRole::from_role_name("Admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_role_name("manager"), Some(UserRole::Manager));
        assert_eq!(UserRole::from_role_name("USER"), Some(UserRole::User));
        assert_eq!(UserRole::from_role_name("Auditor"), None);
    }

    #[test]
    fn static_tables_nest() {
        let user = UserRole::User.static_permissions();
        let manager = UserRole::Manager.static_permissions();
        let admin = UserRole::Admin.static_permissions();
        assert!(user.is_subset(&manager));
        assert!(manager.is_subset(&admin));
    }

    #[test]
    fn admin_has_every_builtin() {
        let admin = UserRole::Admin.static_permissions();
        for p in stockflow_core::builtin_permissions() {
            assert!(admin.contains(p.name), "admin missing {}", p.name);
        }
    }
}
