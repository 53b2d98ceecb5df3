pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

pub use extractors::AuthUser;
