pub mod background;
pub mod config;
pub mod job;
pub mod session;

pub use background::{Background, BackgroundCatalog};
pub use config::ServiceConfig;
pub use job::{Gender, GenerationJob, GenerationOptions, Prominence};
pub use session::{Session, SessionStatus, SessionView};
