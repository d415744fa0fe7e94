//! Chunked reply relay.
//!
//! - [`stream`]: Fragment-to-body relay loop with sentinel framing
//! - [`markers`]: Sentinel constants and marker stripping
//! - [`prompt`]: Preamble + question assembly

pub mod markers;
pub mod prompt;
pub mod stream;

pub use markers::{strip_markers, MarkerStripper, STREAM_END, STREAM_ERROR, STREAM_START};
pub use prompt::PromptTemplate;
pub use stream::{Relay, RelayPhase};
