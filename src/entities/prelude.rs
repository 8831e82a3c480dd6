pub use super::activity_history::Entity as ActivityHistory;
pub use super::rfid_cards::Entity as RfidCards;
pub use super::users::Entity as Users;
