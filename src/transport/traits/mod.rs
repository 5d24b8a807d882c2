//! Abstraction traits for the collaborators the core drives but does not own:
//! the CAN peripheral, a timer, the configuration byte stream and the
//! non-volatile store.
pub mod byte_stream;
pub mod frame_source;
pub mod persistent_store;
pub mod timer;
