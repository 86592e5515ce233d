mod in_memory_test;
mod sqlx_mysql;

pub use self::in_memory_test::{InMemoryTestFactory, InMemoryTestResponseBuilder, RecordedQuery};
pub use self::sqlx_mysql::{SqlxMySqlConnection, SqlxMySqlFactory};
