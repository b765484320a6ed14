pub mod budget;
pub mod membership;
pub mod project;
pub mod result;
pub mod risk;
pub mod task;
pub mod user;
