//! Services layer - Business logic
//!
//! Services implement the portal's rules on top of the repositories:
//! - Accounts and login sessions (`user`, `session_store`)
//! - The personal centre: profile edits, uploads, listings (`profile`)
//!
//! Handlers only translate between HTTP and these services.

pub mod password;
pub mod profile;
pub mod session_store;
pub mod user;

pub use password::{hash_password, verify_password};
pub use profile::{
    ImageUpload, NewsSubmission, ProfileError, ProfileRepositories, ProfileService, ProfileSettings,
};
pub use session_store::{SessionData, SessionStore};
pub use user::{UserService, UserServiceError};
