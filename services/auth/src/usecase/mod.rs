pub mod account;
pub mod oauth;
pub mod rbac;
pub mod session;
