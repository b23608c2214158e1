pub mod export;
pub mod history;
