pub mod api;
pub mod command;
pub mod config;
pub mod dashboard;
pub mod facility;
pub mod model;
pub mod notify;
pub mod pagination;
pub mod poller;
pub mod render;
pub mod review;
