pub mod batch;
pub mod config;
pub mod images;
pub mod model;
pub mod parser;
pub mod sftp;
pub mod wordpress;
