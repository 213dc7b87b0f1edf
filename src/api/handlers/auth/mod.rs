//! Auth handlers and supporting modules.
//!
//! This module coordinates the two sign-in flows, session management, and
//! role-based authorization.
//!
//! ## Flows
//!
//! - **Credentials**: email/password verified against an argon2 hash, then a
//!   database-backed session referenced by an `HttpOnly` cookie. Session
//!   expiry slides forward on activity.
//! - **Stateless**: a signed assertion from the identity provider is exchanged
//!   for a signed bearer token; no session row is created.
//!
//! The flow is chosen by the route, never inferred from request contents.
//!
//! ## Roles
//!
//! Membership roles are ranked `Owner` (0), `Admin` (1), `Member` (2); a
//! lower rank always means more privilege. Authorization thresholds live in
//! [`guard`].

mod credentials;
pub(crate) mod flow;
pub(crate) mod guard;
pub(crate) mod principal;
mod rate_limit;
pub(crate) mod reset;
pub(crate) mod session;
pub(crate) mod sso;
mod state;
mod storage;
#[cfg(test)]
mod tests;
pub(crate) mod token;
pub(crate) mod types;
pub(crate) mod utils;

pub use rate_limit::{FixedWindowRateLimiter, NoopRateLimiter, RateLimiter};
pub use state::{AuthConfig, AuthState};
