pub mod config;
pub mod import;
pub mod query;
pub mod recommend;
pub mod status;

pub use config::{init_config, show_config, show_example, show_path};
pub use import::run_import;
pub use query::{
    active_users, filter_artists, search_artists, show_artist, show_friends, top_artists,
    top_tags,
};
pub use recommend::run_recommend;
pub use status::show_status;
