pub mod player;
pub mod player_round_result;
pub mod round;
pub mod round_result;
pub mod team;
