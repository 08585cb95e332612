// Core content module - mission projects, community posts and the store port.

pub mod content_models;
pub mod content_service;
pub mod content_store;
pub mod sample_missions;

pub use content_models::*;
pub use content_service::{decode_collection, ContentError, ContentService, LikeState, Vote};
pub use content_store::{split_path, RecordStore, StoreError, Subscription};
