//! Rekey Secret
//!
//! Handling of secret material during credential rotation:
//!
//! - [`SecretString`] holds plaintext tokens and keys, is redacted in
//!   `Debug`/`Display` and zeroed on drop.
//! - [`SecretHasher`] is the one-way salted digest capability; the
//!   [`Argon2Hasher`] implementation runs Argon2id off the async runtime.
//! - [`CredentialGenerator`] produces new opaque credentials; the
//!   [`UuidGenerator`] implementation draws 122 random bits from the OS.

mod error;
mod generator;
mod hasher;
mod secret;

pub use error::{GenerateError, HashError};
pub use generator::{CredentialGenerator, UuidGenerator};
pub use hasher::{Argon2Hasher, SecretHasher};
pub use secret::SecretString;
