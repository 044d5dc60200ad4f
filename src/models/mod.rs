mod channel;
mod credential;
mod video;

pub use channel::{shorts_collection_id, upload_collection_id, Channel, ChannelFilter, NewChannel};
pub use credential::Credential;
pub use video::{NewVideo, Video, VideoDetailsUpdate};
