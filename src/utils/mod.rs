pub mod fare;
pub mod geo;
pub mod ids;
pub mod jwt;
pub mod pagination;
pub mod response;
