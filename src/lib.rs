pub mod config;
pub mod decoder;
pub mod error;
pub mod informer;
pub mod model;
pub mod publisher;
pub mod relay;
pub mod shutdown;
pub mod timestamp;

pub mod kafka;

pub use config::Config;
pub use error::{Error, Result};
pub use publisher::Publisher;
pub use relay::{Relay, Subscription};
