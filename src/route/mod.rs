pub mod auth;
pub mod comment;
pub mod docs;
pub mod model;
pub mod post;
pub mod search;
pub mod tag;
pub mod upload;
pub mod user;
