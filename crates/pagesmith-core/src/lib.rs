pub mod config;
pub mod continuity;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod fingerprint;
pub mod generate;
pub mod invoker;
pub mod io;
pub mod keywords;
pub mod license;
pub mod paths;
pub mod persist;
pub mod prompt;
pub mod readme;
pub mod reconcile;
pub mod round;

#[cfg(test)]
mod testing;

pub use config::{EngineConfig, OwnerHints};
pub use error::{PagesmithError, Result};
pub use fingerprint::DesignFingerprint;
pub use generate::{GenerationOutcome, GenerationSource, Generator};
pub use round::{Round, RoundContext};
