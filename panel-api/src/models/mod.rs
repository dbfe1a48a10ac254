pub mod inbound;
pub mod msg;
pub mod user;

pub use inbound::{Client, Inbound, Membership, Protocol};
pub use msg::{Count, Msg};
pub use user::{AuthUser, User, LOGIN_USER_KEY};
