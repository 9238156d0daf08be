pub mod category_service;
pub mod ip_provider;
pub mod ip_security_service;
