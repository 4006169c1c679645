pub mod classify;
pub mod handlers;
pub mod intent;
pub mod pipeline;

pub use classify::LlmIntentClassifier;
pub use intent::Intent;
pub use pipeline::{CommandError, CommandProcessor};
