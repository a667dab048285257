pub mod content;
pub mod ping;
pub mod records;
pub mod serve;
