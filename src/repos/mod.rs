pub mod crud;
pub mod error;
pub mod memory_user_repo;
pub mod user_repo;

pub use crud::{CrudRepository, Entity};
pub use error::{RepoError, RepoResult};
pub use memory_user_repo::MemoryUserRepository;
pub use user_repo::{PgUserRepository, User, UserRepository};
