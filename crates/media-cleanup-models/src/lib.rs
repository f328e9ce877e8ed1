pub mod media;
pub mod status;
pub mod watch_history;
pub mod excluded_item;
pub mod text;

pub use media::{ManagerMetadata, MediaIds, MediaItem, MediaKind, MediaMetadata, SeriesDetails, ServerRef};
pub use status::{SeriesStatus, SeriesType};
pub use watch_history::WatchRecord;
pub use excluded_item::ExcludedItem;
pub use text::eq_ignore_case;
