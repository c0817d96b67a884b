//! End-to-end behaviour of a playback session against fake collaborators

pub mod registry;
pub mod track_store;
