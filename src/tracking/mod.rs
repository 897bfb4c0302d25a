pub mod eta;
pub mod gate;
pub mod poller;
pub mod position;
pub mod resolver;
pub mod session;
pub mod trail;
pub mod view;

#[cfg(feature = "gpx")]
pub mod gpx;
