// Core moderation module - banned-word and link checks for submitted content.
// Following the same pattern as the workflow module.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
