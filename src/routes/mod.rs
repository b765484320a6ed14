pub mod auth;
pub mod health;
pub mod memberships;
pub mod projects;
pub mod resources;
