pub mod command;
pub mod crc16;
pub mod engine;
