pub mod chat;
pub mod quota;
pub mod user;

pub use chat::*;
pub use quota::*;
pub use user::*;
