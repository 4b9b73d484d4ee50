pub mod cli;
pub mod forms;
pub mod gather;
pub mod store;
