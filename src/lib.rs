pub mod application;
pub mod asset;
pub mod cleanup;
pub mod commands;
pub mod download;
pub mod error;
pub mod http;
pub mod package;
pub mod provider;
pub mod runtime;
