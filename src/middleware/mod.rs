pub mod session;

pub use session::{AuthSession, Session};
