pub mod api;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod poller;
pub mod scroller;
pub mod session;
pub mod settings;
pub mod status;
pub mod store;
pub mod timer;
pub mod ui;
pub mod viewport;
pub mod window;
