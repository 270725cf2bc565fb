pub mod db;
pub mod entes;
pub mod repository;
pub mod settings;
pub mod spreadsheet;
