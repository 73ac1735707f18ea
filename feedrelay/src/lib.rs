// Library interface for feedrelay modules
// This allows tests and other binaries to import modules

pub mod extraction;
pub mod ingestion;
pub mod server;
