// Library for tests to access modules

pub mod cluster;
pub mod config;
pub mod metrics_source;
pub mod models;
pub mod routes;
pub mod store;
pub mod version;
pub mod worker;
