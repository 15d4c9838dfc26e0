mod mssql;

pub use self::in_memory_test::{
    InMemoryTestDriver, InMemoryTestResponseBuilder, RecordedQuery, ScriptedResponse,
};
pub use self::mssql::MssqlDriver;
