//! Entity definitions for the persistence layer

pub mod chat_message;
pub mod stream;

pub use chat_message::ChatMessageRecord;
pub use stream::{
    generate_stream_id, generate_stream_key, CreateStreamRequest, StreamCategory, StreamRecord,
};
