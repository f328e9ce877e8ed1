pub mod api;
pub mod client;

pub use api::{parse_list_url, TraktList};
pub use client::TraktClient;
