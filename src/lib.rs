//! Authenticated HTTP file server
//!
//! Clients download files from the upload directory with `GET` and add files
//! with a multipart `POST` to the upload route, both behind a single shared
//! Basic-auth credential.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
