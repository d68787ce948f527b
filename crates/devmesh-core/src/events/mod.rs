//! Events flowing out of the forward proxy.
//!
//! The proxy reports bundler progress on its diagnostic stream; this module
//! owns the wire format and the typed events decoded from it.

mod status;

pub use status::{
    BUNDLE_FAIL, BUNDLE_START, BUNDLE_SUCCESS, BundleId, DecodeError, StatusEvent, decode,
};
