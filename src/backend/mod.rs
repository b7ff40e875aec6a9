pub mod dispatcher;
pub mod feed;
pub mod rest;
