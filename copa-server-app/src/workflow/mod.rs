pub mod admin;
pub mod players;
pub mod rounds;
pub mod scoring;
pub mod standings;
pub mod teams;
