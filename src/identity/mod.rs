//! Client-side identity: who is signed in, how that is persisted between runs, and the
//! credential round-trips needed to get there.
//! Keep the public surface thin and split implementation across sub-modules.

mod profile;
mod provider;
mod session;
pub mod storage;

pub use profile::{Role, UserProfile};
pub use provider::{AuthProvider, LoginRequest, RegisteredAccount, RegistrationRequest, TokenGrant};
pub use session::{Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
