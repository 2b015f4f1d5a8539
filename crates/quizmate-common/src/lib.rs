pub mod code;
pub mod error;
pub mod events;
pub mod judge;
pub mod lobby;
pub mod member;
pub mod player;
pub mod protocol;
pub mod question;
pub mod room;
