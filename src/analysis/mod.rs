pub mod cells;
pub mod dates;
pub mod mapper;
pub mod payments;
pub mod portfolio;
pub mod predictive;
pub mod thesis;
