pub mod handlers;
pub mod manager;
pub mod password;
pub mod permissions;
pub mod tokens;

pub use manager::AccountManager;
