use std::error::Error;

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod handler;
pub mod integrations;
pub mod model;
pub mod notify;
pub mod store;
pub mod upstream;

pub fn unpack_error(err: &dyn Error) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
