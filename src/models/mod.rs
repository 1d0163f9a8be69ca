pub mod bookingmodel;
pub mod chatmodels;
pub mod consultantmodel;
pub mod reviewmodel;
pub mod usermodel;
