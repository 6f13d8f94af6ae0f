//! # auth-adapters
//!
//! Identity-provider adapters. Each one turns a bearer credential into a
//! `domains::Principal` through the `IdentityProvider` port.

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::{Claims, JwtIdentity, TokenError};
