pub mod dialog;
pub mod health;

pub use dialog::generate_dialog;
pub use health::{health_check, index, metrics, readiness_check};
