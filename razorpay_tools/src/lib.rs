//! A minimal, typed client for the Razorpay Orders REST API.
//!
//! The keepsake server only needs two calls: creating an order before checkout, and fetching an order's state when an
//! operator wants to inspect one. Both are exposed on [`RazorpayApi`]. Authentication is HTTP basic auth using the
//! key id / key secret pair issued by the gateway dashboard.

mod api;
mod config;
mod error;

mod data_objects;
mod helpers;

pub use api::RazorpayApi;
pub use config::RazorpayConfig;
pub use data_objects::{NewOrderRequest, OrderApiStatus, RazorpayOrder};
pub use error::RazorpayApiError;
pub use helpers::new_receipt_id;
