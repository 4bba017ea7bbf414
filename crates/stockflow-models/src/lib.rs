//! # StockFlow Models
//!
//! Domain models and DTOs for the StockFlow authorization and notification
//! engines.
//!
//! - [`ids`]: strongly-typed UUID newtypes per entity
//! - [`channels`]: the delivery-channel bitmask
//! - [`enums`]: notification type/priority/status and the legacy role view
//! - [`roles`]: roles, permissions, grant edges, and the request principal
//! - [`preferences`]: per-user notification preference rows
//! - [`notifications`]: notification instances, templates, and the delivery
//!   state machine

pub mod channels;
pub mod enums;
pub mod ids;
pub mod notifications;
pub mod preferences;
pub mod roles;

pub use channels::{Channel, ChannelMask};
pub use enums::{NotificationPriority, NotificationStatus, NotificationType, UserRole};
pub use ids::{NotificationId, PermissionId, PreferenceId, RoleId, TemplateId, UserId};
pub use notifications::{Notification, NotificationTemplate};
pub use preferences::NotificationPreference;
pub use roles::{Permission, Principal, Role, RolePermission, RoleRef, RoleWithPermissions};
