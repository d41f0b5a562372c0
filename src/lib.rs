pub mod app;
pub mod cli;
pub mod dispatch;
pub mod games;
pub mod handler_storage;
pub mod launcher;
pub mod location;
pub mod logging;
pub mod prompt;
pub mod protocol;
pub mod settings;
pub mod store;
