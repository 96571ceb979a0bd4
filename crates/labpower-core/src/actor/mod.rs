//! Actor implementations

pub mod audit_writer;

pub use audit_writer::AuditWriter;
