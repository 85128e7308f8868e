pub mod client;
pub mod decode;
pub mod messages;

pub use client::{HttpQueryService, QueryService, TransportError};
pub use decode::{decode_reply, QueryResult};
pub use messages::{QueryReply, TextQueryRequest};
