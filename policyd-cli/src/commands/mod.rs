pub mod admin;
pub mod config;
pub mod policy;
pub mod providers;
pub mod serve;

use anyhow::Result;
use policyd_core::{EngineConfig, MemoryChangeBus, PolicyManager};
use std::sync::Arc;

use crate::config::{ConfigLoader, Overrides};

/// An engine started from the merged configuration
pub struct Engine {
    pub config: EngineConfig,
    pub bus: Arc<MemoryChangeBus>,
    pub manager: PolicyManager,
}

pub fn start_engine(overrides: &Overrides) -> Result<Engine> {
    let config = ConfigLoader::load(overrides)?;
    let bus = Arc::new(MemoryChangeBus::default());
    let manager = PolicyManager::start(&config, bus.clone())?;
    Ok(Engine {
        config,
        bus,
        manager,
    })
}
