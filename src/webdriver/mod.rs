//! W3C WebDriver backend
//!
//! This module implements the client side of WebDriver for driving
//! browsers through chromedriver, geckodriver or any compatible server.

pub mod client;
pub mod driver;
pub mod types;

pub use client::WebDriverClient;
pub use types::SessionOptions;
