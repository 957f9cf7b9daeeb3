// Data models for the storefront backend

pub mod storefront;

pub use storefront::{ApiErrorBody, Customer, CustomerDetails, LoginRequest, LoginResponse, LoginUser, Order};
