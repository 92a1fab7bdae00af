pub mod arrangement;
pub mod generator;
pub mod history;
pub mod persistence;
pub mod project;
pub mod scenes;
