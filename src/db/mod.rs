pub mod db;

pub mod bookingdb;
pub mod chatdb;
pub mod consultantdb;
pub mod reviewdb;
pub mod userdb;
