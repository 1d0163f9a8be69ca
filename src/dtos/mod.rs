pub mod availabilitydtos;
pub mod bookingdtos;
pub mod chatdtos;
pub mod reviewdtos;
pub mod scheduledtos;
