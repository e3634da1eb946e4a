pub mod battle;
pub mod client_message;
pub mod question;
pub mod server_message;
pub mod session;
