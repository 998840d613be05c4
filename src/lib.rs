//! Fingerprint-based sync and offline cache for workforce scheduling data.
//!
//! [`cache`] holds the domain-agnostic coherence protocol; [`workforce`]
//! plugs employees, shifts, contracts and absences into it.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod workforce;

#[cfg(test)]
mod testing;
