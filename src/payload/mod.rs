//! The payload module turns decoded answer data into domain records.

pub mod profile;

pub use profile::{arrange, decode_profile_date, ProfileData, ProfileLayout, ProfileValues};
