pub mod ente;
pub mod import;
pub mod portfolio;
pub mod projection;
