pub mod category;
pub mod config;
pub mod draft;
pub mod error;
pub mod front_matter;
pub mod github;
pub mod local_state;
pub mod logger;
pub mod post;
pub mod session;
mod test_data;
pub mod text_utils;
pub mod util;
