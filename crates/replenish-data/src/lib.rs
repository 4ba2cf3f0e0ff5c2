pub mod loader;
pub mod logging;
pub mod schema;

pub use loader::{DataLoadError, load_tracker_config, load_tracker_config_from_dir};
