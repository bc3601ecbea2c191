pub mod config;
pub mod db;
pub mod error;
pub mod principal;
pub mod routes;
