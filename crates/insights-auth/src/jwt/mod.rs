//! Bearer token decoding and claims.
//!
//! Tokens are compact JWS strings issued by the external authentication
//! service. Only the payload is read; the signature is never verified here.

pub mod claims;
pub mod decoder;

pub use claims::{Claims, is_expired};
pub use decoder::{DecodeError, TokenCodec};
