pub mod commands;
pub mod decoder;
pub mod error;
pub mod helper;
pub mod pin;
pub mod reader;
pub mod record;
pub mod records;
pub mod session;
pub mod tlv;
pub mod utils;
