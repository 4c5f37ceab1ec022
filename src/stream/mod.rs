pub mod facade;
pub mod urls;

pub use facade::{
    PlaybackInfo, PlaylistResponse, ProgressiveResponse, StreamAccess, StreamListing, StreamStats,
};
pub use urls::PlaybackUrls;
