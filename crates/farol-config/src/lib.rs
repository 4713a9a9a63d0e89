pub mod loader;
pub mod schema;

pub use loader::{find_config_path, load_config, save_config};
pub use schema::{BackendConfig, Config, EditorConfig};
