//! Abstract interfaces of a record log.

pub mod record_log;
