pub mod dialog;
pub mod metrics;
pub mod persona;
pub mod persona_client;
pub mod prompt;
pub mod providers;

pub use dialog::{DialogService, EvalSettings};
pub use persona::{Persona, Trait};
pub use persona_client::{PersonaClient, PersonaError};
pub use prompt::compose_prompt;
