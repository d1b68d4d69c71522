//! Browser session layer: realistic client identities, cookie-persisting
//! provider sessions with challenge absorption, and the per-provider
//! session pool with scoped acquisition.

pub mod identity;
pub mod pool;
pub mod session;

pub use identity::BrowserIdentity;
pub use pool::{ScopedSession, SessionPool};
pub use session::ProviderSession;
