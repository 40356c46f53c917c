//! Clients for the remote services of the add-on delivery process.

pub mod aakaas;
pub mod bfw;
pub mod mgit;
