pub mod access;
pub mod legacy_import;
pub mod store;
