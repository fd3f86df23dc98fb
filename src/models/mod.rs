pub mod item;
pub mod user;

pub use item::Item;
pub use user::User;
