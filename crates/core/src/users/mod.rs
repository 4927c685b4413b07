//! Email-keyed user accounts.
//!
//! The pieces are composed rather than inherited:
//! 1. [`User`]: the plain record
//! 2. [`UserStore`]: the persistence capability (implemented by [`crate::Database`])
//! 3. [`PasswordHasher`]: the hashing capability ([`BcryptHasher`])
//! 4. [`UserManager`]: the validated constructors and save/authenticate flows

pub mod email;
pub mod manager;
pub mod model;
pub mod password;
pub mod store;

pub use email::{normalize_email, validate_email};
pub use manager::{ExtraFields, UserManager};
pub use model::{Group, User};
pub use password::{BcryptHasher, PasswordHasher, PasswordPolicy, UserAttributes};
pub use store::{UserQuery, UserStore};
