//! SQLite record-store backend for the settlement and messaging core.

mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
