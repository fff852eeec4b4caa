pub mod archive;
pub mod audit;
pub mod config;
pub mod discovery;
pub mod fixups;
pub mod layout;
pub mod mem_storage;
pub mod orchestrator;
pub mod paths;
pub mod plan;
pub mod reconcile;
pub mod script;
pub mod settings_migration;
pub mod settings_tree;
pub mod storage;
pub mod tag_rename;
pub mod tokens;
pub mod util;
pub mod warn;

#[cfg(test)]
mod fixtures;
