//! # insights-auth
//!
//! Client-side authentication and session lifecycle for the Production
//! Insights dashboard.
//!
//! ## Modules
//!
//! - `jwt`: bearer token decoding into claims (no signature verification)
//! - `store`: shared slot stores and the typed credential store
//! - `session`: the auth session manager, session clock, and user profile
//! - `renewal`: the interactive renewal prompt contract and its driver
//! - `guard`: route guarding for protected views
//! - `client`: the HTTP authentication collaborator and bearer-authorized requests
//! - `debug`: the persisted debug-mode flag

pub mod client;
pub mod debug;
pub mod error;
pub mod guard;
pub mod jwt;
pub mod renewal;
pub mod session;
pub mod store;

pub use client::{Authenticator, AuthorizedClient, Credentials, HttpAuthenticator, LoginResponse};
pub use debug::DebugMode;
pub use error::{AuthError, AuthErrorCategory};
pub use guard::{GuardDecision, RouteGuard};
pub use jwt::{Claims, DecodeError, TokenCodec};
pub use renewal::{PromptResponse, RenewalDriver, RenewalOutcome, RenewalPrompt, RenewalRequest};
pub use session::{
    AuthPhase, AuthSessionManager, ExpiryNotifier, ExpirySource, RolePolicy, SessionClock,
    SessionSnapshot, SystemTimeSource, TimeSource, UserProfile,
};
pub use store::{Backend, CredentialStore, FileStore, MemoryStore, open_backend};
