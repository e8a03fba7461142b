pub mod sessions;
pub mod stats;

pub use sessions::SessionRegistry;
pub use stats::{KioskStats, KioskStatsBoard};
