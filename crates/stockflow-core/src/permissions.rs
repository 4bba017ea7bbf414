//! Permission constants for the StockFlow core.
//!
//! This module provides centralized permission string constants for use across
//! the codebase. Using these constants instead of string literals ensures
//! consistency and makes refactoring easier. Names follow the
//! `category.action` form enforced by [`is_valid_permission_name`].
//!
//! # Example
//!
//! ```ignore
//! use stockflow_core::permissions;
//!
//! if evaluator.has_permission(&principal, permissions::product::CREATE).await? {
//!     // Create product
//! }
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// User management permissions.
pub mod users {
    pub const VIEW: &str = "users.view";
    pub const CREATE: &str = "users.create";
    pub const EDIT: &str = "users.edit";
    pub const DELETE: &str = "users.delete";
    pub const VIEW_ALL: &str = "users.view_all";
    pub const MANAGE_ROLES: &str = "users.manage_roles";
    pub const VIEW_REPORTS: &str = "users.view_reports";
}

/// Product management permissions.
pub mod product {
    pub const VIEW: &str = "product.view";
    pub const CREATE: &str = "product.create";
    pub const EDIT: &str = "product.edit";
    pub const DELETE: &str = "product.delete";
    pub const UPDATE_STOCK: &str = "product.update_stock";
    pub const VIEW_REPORTS: &str = "product.view_reports";
}

/// Invoice management permissions.
pub mod invoice {
    pub const VIEW: &str = "invoice.view";
    pub const CREATE: &str = "invoice.create";
    pub const EDIT: &str = "invoice.edit";
    pub const DELETE: &str = "invoice.delete";
    pub const VIEW_ALL: &str = "invoice.view_all";
    pub const MANAGE_ITEMS: &str = "invoice.manage_items";
}

/// System administration permissions.
pub mod system {
    pub const VIEW_ADMIN_PANEL: &str = "system.view_admin_panel";
    pub const MANAGE_SETTINGS: &str = "system.manage_settings";
    pub const VIEW_LOGS: &str = "system.view_logs";
    pub const SYNC_DATA: &str = "system.sync_data";
    pub const VIEW_STATISTICS: &str = "system.view_statistics";
}

/// Data management permissions.
pub mod data {
    pub const EXPORT: &str = "data.export";
    pub const IMPORT: &str = "data.import";
    pub const BACKUP: &str = "data.backup";
    pub const RESTORE: &str = "data.restore";
}

/// Reporting permissions.
pub mod reports {
    pub const VIEW_BASIC: &str = "reports.view_basic";
    pub const VIEW_ADVANCED: &str = "reports.view_advanced";
    pub const GENERATE: &str = "reports.generate";
    pub const SCHEDULE: &str = "reports.schedule";
}

/// A permission definition shipped with the system.
///
/// The catalog seeds these rows on first run; names are immutable once a
/// grant references them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinPermission {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

const fn perm(
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    category: &'static str,
) -> BuiltinPermission {
    BuiltinPermission {
        name,
        display_name,
        description,
        category,
    }
}

/// Every permission the system ships with, grouped by category.
pub fn builtin_permissions() -> &'static [BuiltinPermission] {
    const BUILTIN: &[BuiltinPermission] = &[
        // Users
        perm(users::VIEW, "View Users", "View user profiles", "Users"),
        perm(users::CREATE, "Create Users", "Create new user accounts", "Users"),
        perm(users::EDIT, "Edit Users", "Edit user profiles", "Users"),
        perm(users::DELETE, "Delete Users", "Delete user accounts", "Users"),
        perm(users::VIEW_ALL, "View All Users", "List every user account", "Users"),
        perm(
            users::MANAGE_ROLES,
            "Manage User Roles",
            "Assign and remove roles from users",
            "Users",
        ),
        perm(
            users::VIEW_REPORTS,
            "View User Reports",
            "View user activity reports",
            "Users",
        ),
        // Product
        perm(product::VIEW, "View Products", "View product listings", "Product"),
        perm(product::CREATE, "Create Products", "Add new products", "Product"),
        perm(product::EDIT, "Edit Products", "Edit product details", "Product"),
        perm(product::DELETE, "Delete Products", "Remove products", "Product"),
        perm(
            product::UPDATE_STOCK,
            "Update Stock",
            "Adjust product stock levels",
            "Product",
        ),
        perm(
            product::VIEW_REPORTS,
            "View Product Reports",
            "View stock and sales reports",
            "Product",
        ),
        // Invoice
        perm(invoice::VIEW, "View Invoices", "View own invoices", "Invoice"),
        perm(invoice::CREATE, "Create Invoices", "Create new invoices", "Invoice"),
        perm(invoice::EDIT, "Edit Invoices", "Edit invoice details", "Invoice"),
        perm(invoice::DELETE, "Delete Invoices", "Delete invoices", "Invoice"),
        perm(
            invoice::VIEW_ALL,
            "View All Invoices",
            "View invoices across all users",
            "Invoice",
        ),
        perm(
            invoice::MANAGE_ITEMS,
            "Manage Invoice Items",
            "Add and remove invoice line items",
            "Invoice",
        ),
        // System
        perm(
            system::VIEW_ADMIN_PANEL,
            "View Admin Panel",
            "Access the administration panel",
            "System",
        ),
        perm(
            system::MANAGE_SETTINGS,
            "Manage Settings",
            "Change system settings",
            "System",
        ),
        perm(system::VIEW_LOGS, "View Logs", "Inspect system logs", "System"),
        perm(system::SYNC_DATA, "Sync Data", "Trigger data synchronization", "System"),
        perm(
            system::VIEW_STATISTICS,
            "View Statistics",
            "View system-wide statistics",
            "System",
        ),
        // Data
        perm(data::EXPORT, "Export Data", "Export data sets", "Data"),
        perm(data::IMPORT, "Import Data", "Import data sets", "Data"),
        perm(data::BACKUP, "Backup Data", "Create data backups", "Data"),
        perm(data::RESTORE, "Restore Data", "Restore from a backup", "Data"),
        // Reports
        perm(
            reports::VIEW_BASIC,
            "View Basic Reports",
            "View basic reports",
            "Reports",
        ),
        perm(
            reports::VIEW_ADVANCED,
            "View Advanced Reports",
            "View advanced reports",
            "Reports",
        ),
        perm(reports::GENERATE, "Generate Reports", "Generate new reports", "Reports"),
        perm(
            reports::SCHEDULE,
            "Schedule Reports",
            "Schedule recurring reports",
            "Reports",
        ),
    ];
    BUILTIN
}

static PERMISSION_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]+\.[a-z_]+$").expect("permission name pattern is valid")
});

/// Whether a permission name matches the `category.action` shape.
///
/// Only enforced on create; lookups of malformed names simply miss.
pub fn is_valid_permission_name(name: &str) -> bool {
    PERMISSION_NAME_RE.is_match(name)
}
