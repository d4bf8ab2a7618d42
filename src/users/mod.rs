mod repo;

pub use repo::{PgUserDirectory, UserDirectory};
