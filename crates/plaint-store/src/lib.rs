pub mod resources;
pub mod sqlite;

pub use resources::AgencyDirectory;
pub use sqlite::SqliteComplaintStore;
