pub mod cache;
pub mod cli;
pub mod config;
pub mod failover;
pub mod gateway;
pub mod nodes;
pub mod rpc;
pub mod upstream;
