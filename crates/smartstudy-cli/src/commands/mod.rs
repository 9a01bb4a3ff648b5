//! Command implementations.

pub mod generate;
pub mod sessions;
pub mod settings;

pub use self::generate::execute_generate;
pub use self::sessions::execute_sessions;
pub use self::settings::execute_settings;
