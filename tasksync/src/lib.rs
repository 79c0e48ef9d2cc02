//! `tasksync`: optimistic task and category state synchronization.

pub mod config;
pub mod context;
pub mod remote;
pub mod storage;
pub mod store;
pub mod sync;
pub mod ui;
pub mod view;
