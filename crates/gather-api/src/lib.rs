pub mod accounts;
pub mod authz;
pub mod blacklist;
pub mod comments;
pub mod error;
pub mod events;
pub mod jwt;
pub mod keys;
pub mod middleware;
pub mod password;
pub mod routes;
pub mod state;
pub mod validate;
