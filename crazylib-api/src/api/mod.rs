//! HTTP API handlers for crazylib-api

pub mod books;
pub mod customers;
pub mod events;
pub mod health;

pub use books::book_routes;
pub use customers::customer_routes;
pub use events::event_routes;
pub use health::health_routes;
