mod user_directory;

pub use user_directory::{PgUserDirectory, UserDirectory, UserLookupError};
