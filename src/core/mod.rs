// src/core/mod.rs

pub mod build_context;
pub mod build_plan;
pub mod config_merger;
pub mod config_store;
pub mod instructions;
pub mod paths;
pub mod restart_store;
pub mod schema;
pub mod task_executor;
