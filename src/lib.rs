// Profile Smoke Test Library
//
// Drives the login and profile update flow of the web frontend over HTTP and
// reports whether profile writes are visible to the next read.

pub mod api_client;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod scenarios;
pub mod session;
