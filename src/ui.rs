pub mod board;
pub mod layout;
pub mod reader;
pub mod windows;
