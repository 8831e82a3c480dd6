pub mod prelude;

pub mod activity_history;
pub mod rfid_cards;
pub mod users;
