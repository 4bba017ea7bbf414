//! # StockFlow Notify
//!
//! The notification side of the engine:
//!
//! - [`template`]: placeholder rendering and the template service
//! - [`preferences`]: the delivery decision pipeline and preference
//!   management
//! - [`batch`]: per-(user, type) accumulation for batched delivery
//! - [`defer`]: holds quiet-hours-deferred notifications until their window
//!   closes
//! - [`dispatch`]: drives a notification through decision, delivery log and
//!   lifecycle transitions

pub mod batch;
pub mod defer;
pub mod dispatch;
pub mod preferences;
pub mod template;

pub use batch::BatchQueue;
pub use defer::DeferredQueue;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use preferences::{DeliveryDecision, PreferenceResolver, PreferenceService};
pub use template::{TemplateRenderer, TemplateService, TemplateValidation};
