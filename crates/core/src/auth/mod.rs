//! Credentials: password hashing and bearer tokens.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, IssuedToken, TokenService};
