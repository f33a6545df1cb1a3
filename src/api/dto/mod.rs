//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifiers travel as plain UUIDs and integers; podiums as arrays of
//! competitor codes, winner first.

pub mod common_dto;
pub mod event_dto;
pub mod participant_dto;
pub mod prediction_dto;
pub mod standings_dto;

pub use common_dto::*;
pub use event_dto::*;
pub use participant_dto::*;
pub use prediction_dto::*;
pub use standings_dto::*;
