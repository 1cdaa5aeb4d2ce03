//! Session lifecycle: resume, login, logout, expiry polling, and renewal.

pub mod clock;
pub mod manager;
pub mod profile;
pub mod state;

pub use clock::{
    ClockHandle, ExpiryNotifier, ExpirySource, ExpiryWatch, SessionClock, SystemTimeSource,
    TimeSource,
};
pub use manager::AuthSessionManager;
pub use profile::{DerivedRole, RolePolicy, UserProfile};
pub use state::{AuthPhase, RenewalPromptState, SessionSnapshot};
