// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "workflow/mod.rs"]
pub mod workflow;

#[path = "identity/identity_models.rs"]
pub mod identity;

#[path = "content/mod.rs"]
pub mod content;

#[path = "catalog/catalog_service.rs"]
pub mod catalog;

#[path = "engagement/engagement_tracker.rs"]
pub mod engagement;
