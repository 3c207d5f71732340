pub mod decimal;
pub mod logging;
pub mod response;
