//! Token and cookie types shared by the Gatehouse services.
//!
//! Provides the signed-token codec (access, refresh, verify-email,
//! reset-password, oauth-state) and the refresh-cookie builders.

pub mod cookie;
pub mod token;
