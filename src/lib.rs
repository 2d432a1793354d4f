pub mod api;
pub mod config;
pub mod controller;
pub mod images;
pub mod model;
pub mod qr;
pub mod session;
