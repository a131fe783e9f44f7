//! HTTP route handlers.

pub mod csrf_cookie;
pub mod debug;
pub mod echo;
pub mod health;
pub mod logout;
