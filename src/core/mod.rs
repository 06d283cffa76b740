pub mod book_manager;
pub mod errors;
pub mod services;
pub mod utils;

pub use book_manager::BookManager;
pub use errors::{CrmError, Result};
