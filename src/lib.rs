pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod notifications;
pub mod repository;
pub mod service;
