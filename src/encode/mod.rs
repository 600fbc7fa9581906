//! Encoders that turn cleaned feature rows into numeric model inputs.
//!
//! Both encoders serialize their fitted state (vocabulary, codebook) through
//! the artifact store so training and prediction share one feature space.

pub mod categorical;
pub mod text;

pub use categorical::OrdinalCodebook;
pub use text::CountVectorizer;

use thiserror::Error;

/// Errors raised while encoding rows.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Encoder has not been fitted")]
    NotFitted,
}
