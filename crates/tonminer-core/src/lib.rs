pub mod constants;
pub mod error;
pub mod input;
pub mod state;
pub mod types;

pub use constants::*;
pub use error::MinerError;
pub use input::ConfigInput;
pub use state::*;
pub use types::*;
