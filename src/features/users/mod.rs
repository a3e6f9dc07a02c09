//! User directory feature.
//!
//! Accounts are owned by the user service; reports only need to check that an
//! owner exists and resolve display names, so this feature is read-only.

pub mod models;
pub mod repositories;

pub use models::User;
pub use repositories::{PgUserDirectory, UserDirectory, UserLookupError};
