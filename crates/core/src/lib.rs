//! Vantage domain core.
//!
//! Zero internal dependencies: shared types, the job model, presence
//! tracking, the collaboration wire protocol, asset formats, file storage
//! layout, and subprocess execution used by the processing workers.

pub mod collaboration;
pub mod error;
pub mod formats;
pub mod jobs;
pub mod presence;
pub mod storage;
pub mod subprocess;
pub mod types;
