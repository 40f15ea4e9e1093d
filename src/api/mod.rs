pub mod health;
pub mod auth;
pub mod dashboard;
pub mod credentials;
pub mod budget;
pub mod campaigns;
pub mod swagger;
