// Mission portal core: content filter, approval workflow and engagement over a
// synchronized record store.
//
// - `core/` = Business logic (moderation, workflow, content, catalog)
// - `infra/` = Implementations of core traits (record stores)
// - `config` = Environment configuration for the service binary

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub mod config;
