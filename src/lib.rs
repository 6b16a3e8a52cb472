pub mod api;
pub mod config;
pub mod domain;
pub mod routing;
pub mod services;
pub mod session;
