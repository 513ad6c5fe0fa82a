pub mod bus;
pub mod config;
pub mod flows;
pub mod link;
