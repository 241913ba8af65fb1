//! Snapgate Crypto - credentials, tokens and request signing
//!
//! - [`CredentialHasher`]: scrypt password digests for snapshot gates
//! - [`TokenCodec`]: HMAC-signed expiring bearer tokens, shared by producer
//!   sessions and viewer gate cookies
//! - [`RequestSigner`]: presigned object-storage URLs for direct uploads
//! - [`generate`]: snapshot ids, gate passwords and viewer fingerprints
//!
//! Nothing here touches the clock or the OS RNG directly; callers pass the
//! current time and a [`RandomSource`](snapgate_core::effects::RandomSource).

#![forbid(unsafe_code)]

pub mod generate;
pub mod password;
pub mod presign;
pub mod token;

pub use generate::{content_hash, gate_password, snapshot_id, viewer_fingerprint};
pub use password::{CredentialHasher, ScryptCost};
pub use presign::{PresignedUrl, RequestSigner};
pub use token::{ProducerClaims, TokenCodec, ViewerGateClaims};
