pub mod handlers;
pub mod params;
pub mod routes;

pub use handlers::ApiContext;
pub use routes::create_router;
