pub mod config;
pub mod constants;
pub mod logger;
pub mod sensor;
pub mod service;
pub mod state;
pub mod wifi;

mod daemon;


pub use service::{SmokService, WifiOutcome};

pub mod utils {
    pub use super::daemon::*;
}
