//! Shared plumbing for the xlsx package: XML parsing and writing, ZIP access.
pub(crate) mod xml;
pub(crate) mod zip;
