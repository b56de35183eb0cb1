//! OpenShift build resources: listing, decoding and cancellation.

mod client;
mod models;

pub use client::{BuildClient, Cancellation};
pub use models::{
    decode_build_list, mark_cancelled, Build, BUILD_CONFIG_LABEL, LEGACY_BUILD_CONFIG_LABEL,
};
