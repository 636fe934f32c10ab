//! Change notifications for effective policy values

mod bus;
mod memory;

pub use bus::{ChangeBus, NotifyError, PolicyChange};
pub use memory::MemoryChangeBus;
