use thiserror::Error;

/// Errors raised by a [`super::Validator`] implementation.
///
/// Deliberately opaque, mirroring the host platform's `AuthError`/
/// `RecordError` style (explicit variants, no blanket `#[from]` on opaque
/// internals).
#[derive(Debug, Error)]
pub enum AuthError {
  #[error("invalid or expired token")]
  Invalid,
}
