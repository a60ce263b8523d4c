#![allow(non_camel_case_types)]

pub mod auth;
pub mod configuration;
pub mod controller;
pub mod dao;
pub mod error;
pub mod model;
pub mod provider;
pub mod push;
pub mod search;
pub mod server;
pub mod types;
