//! AI Interior Designer: a single page that takes a room photo and a style
//! description, hands both to an image-generation backend, and shows the result.

pub mod client;
pub mod config;
pub mod models;
pub mod preview;
pub mod render;
pub mod routes;
pub mod view;
