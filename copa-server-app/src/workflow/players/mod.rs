pub mod correct_kills;
