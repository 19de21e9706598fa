pub mod basket;
pub mod contacts;
pub mod orders;
pub mod partner;
pub mod payload;
pub mod products;
pub mod system;
