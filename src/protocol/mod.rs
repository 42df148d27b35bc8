pub mod header;
pub mod commands;
pub mod report;
pub mod settings;
pub mod temperature;
pub mod codec;
