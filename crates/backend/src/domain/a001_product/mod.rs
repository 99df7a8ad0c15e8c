pub mod repository;

pub use repository::ProductStore;
