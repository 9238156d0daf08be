pub mod category_repository;
pub mod ip_security_repository;
pub mod kv_store;
