pub mod repository;
pub mod service;

pub use repository::{MemorySloRepository, SloRepository, SqlSloRepository};
pub use service::{
    LifecycleAction, LifecycleTransitionRequest, SloLifecycleService, SloModifications, SloTier,
};
