pub mod config;
pub mod db;
pub mod drive;
pub mod error;
pub mod google_oauth;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;
pub mod ui;

pub use error::TrackerError;
pub use router::{AppState, tracker_router};
