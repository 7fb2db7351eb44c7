//! CLI command implementations

mod browser;
pub mod cat;
pub mod config;
pub mod ls;
pub mod stat;

pub use browser::Browser;
pub use cat::execute as cat;
pub use config::execute as config;
pub use ls::execute as ls;
pub use stat::execute as stat;
