//! Merging, building and writing catalogues
//!
//! Partial records collected during a crawl are folded into one
//! [`Addon`](crate::model::Addon) per identity, assembled into a sorted
//! [`Catalogue`](crate::model::Catalogue), and written as validated JSON.

mod builder;
mod merge;
mod validate;
mod writer;

pub use builder::{build_catalogue, build_catalogue_at, datestamp, filter_catalogue, shorten_catalogue};
pub use merge::{group_by_identity, merge, merge_all};
pub use validate::{
    is_valid_date_string, validate_catalogue_file, validate_catalogue_json,
    validate_catalogue_value, ValidationError,
};
pub use writer::{to_json, write_catalogue};
