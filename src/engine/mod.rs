pub mod board;
pub mod bot;
pub mod checkout;
pub mod rules;
pub mod score;
pub mod session;
pub mod throw;
