pub mod clock;
pub mod errors;
pub mod generate;
pub mod limiter;
pub mod models;
pub mod queue;
pub mod reaper;
pub mod registry;
pub mod server;
