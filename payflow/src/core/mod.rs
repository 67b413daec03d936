pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod random;
pub mod state;

pub mod prelude {
    pub use super::{error::ApiError, state::AppState};
}
