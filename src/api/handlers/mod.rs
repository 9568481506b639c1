pub mod forge;
pub mod health;
