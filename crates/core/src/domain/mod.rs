pub mod address;
pub mod cart;
pub mod conversation;
pub mod order;
