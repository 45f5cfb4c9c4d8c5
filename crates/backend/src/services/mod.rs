//! Business logic kept out of the HTTP handlers.

mod authentication;
mod seeder;

pub use authentication::AuthenticationService;
pub use seeder::seed_roles;
