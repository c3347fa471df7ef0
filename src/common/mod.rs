pub mod config;
pub mod distro;
pub mod download;
pub mod env;
pub mod files;
pub mod package;
pub mod paths;
pub mod triplet;
