pub mod config;
pub mod http_api;
pub mod inspect;
pub mod metrics;
pub mod retrieve;
pub mod s3_gateway;
