pub mod execute;
pub mod health;
pub mod intent;
pub mod registry;
pub mod session;
