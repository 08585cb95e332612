// Core workflow module - approval states, permissions and visibility.

pub mod workflow_models;
pub mod workflow_service;

pub use workflow_models::*;
pub use workflow_service::*;
