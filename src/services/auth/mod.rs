pub mod jwt;
pub mod roles;
pub mod session;

pub use jwt::TokenCodec;
pub use session::SessionService;
