pub mod booking;
pub mod request;
pub mod trip;
