pub mod auth;
pub mod client_ip;
pub mod cors;
pub mod csrf;
pub mod error_detail;
pub mod extract;
pub mod request_tracing;
