pub mod history;
pub mod rfid;
pub mod user;
