pub mod catalog;
pub mod core;
pub mod daily_mcqs;
pub mod dashboard;
pub mod locations;
pub mod notices;
pub mod question_sets;
pub mod users;
