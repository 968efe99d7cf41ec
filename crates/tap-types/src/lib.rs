pub mod config;
pub mod event;
pub mod process;
pub mod rpc;
pub mod source;
pub mod subscription;
pub mod tool;
