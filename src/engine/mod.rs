//! Engine API `newPayload` admission.

pub mod admission;
pub mod ancestry;
pub mod blobs;
pub mod block;
pub mod error;
pub mod header;
pub mod payload;
pub mod requests;
pub mod senders;
pub mod status;
pub mod validator;
pub mod version;

pub use admission::{InvalidPayloadLogThrottle, PayloadAdmission};
pub use block::CandidateBlock;
pub use error::EngineApiError;
pub use payload::{NewPayloadRequest, PayloadParameter};
pub use status::{PayloadStatus, PayloadStatusKind};
pub use version::{NewPayloadV1, NewPayloadV2, NewPayloadV3, NewPayloadV4, NewPayloadVersion};
