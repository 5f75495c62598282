pub mod middleware;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod state;
