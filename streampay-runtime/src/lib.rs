pub mod error;
pub mod types;
pub mod validation;
pub mod registry;
pub mod intent;
pub mod payload;
pub mod gate;
pub mod action;
pub mod adapters;
pub mod contracts;
pub mod orchestrator;

pub use error::{FieldError, IntentError};
pub use types::*;
pub use registry::{NetworkConfig, Registry, TokenInfo};
pub use intent::{IntentParser, intent_description, validate_intent};
pub use payload::{PayloadBuilder, SignableAuthorization, canonical_message};
pub use gate::{NonceCache, SignatureGate};
pub use action::ActionRequest;
pub use orchestrator::TransactionOrchestrator;
