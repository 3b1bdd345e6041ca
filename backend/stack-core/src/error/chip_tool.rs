use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ChipToolError {
    #[error("Not Found Error: {message} {location}")]
    NotFound {
        message: String,
        location: ErrorLocation,
    },

    #[error("Storage Error: {message} {location}")]
    Storage {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Commission Error: node {node_id}: {message} {location}")]
    Commission {
        node_id: u64,
        message: String,
        location: ErrorLocation,
    },
}
