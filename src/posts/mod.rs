//! Post endpoints. Reads are public; every mutation goes through
//! [`AuthenticatedUser`](crate::auth::AuthenticatedUser) and the ownership guard.

pub mod handlers;
