//! Radldap server: RADIUS Access-Requests verified against an LDAP directory

pub mod app;
pub mod handler;
pub mod logging;

pub use handler::AccessRequestHandler;
