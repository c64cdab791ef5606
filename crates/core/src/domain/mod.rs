pub mod customer;
pub mod item;
pub mod product;
pub mod quote;
pub mod sheet;
