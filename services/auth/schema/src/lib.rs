//! sea-orm entities for the auth service tables.

pub mod oauth_links;
pub mod refresh_tokens;
pub mod roles;
pub mod users;
