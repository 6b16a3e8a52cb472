mod client_config;

pub use client_config::{BASE_URL_ENV, COOKIE_PATH_ENV, ClientConfig};
