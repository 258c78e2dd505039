pub mod convert_handlers;
pub mod doc;
pub mod graphql;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
