//! Data models

mod access;
mod album;
mod audit;
mod grant;
mod project;
mod role;
mod user;

pub use access::*;
pub use album::*;
pub use audit::*;
pub use grant::*;
pub use project::*;
pub use role::*;
pub use user::*;
