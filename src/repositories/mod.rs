pub mod item;
pub mod user;

pub use item::ItemRepository;
pub use user::UserRepository;
