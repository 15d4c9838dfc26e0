mod driver;

pub use driver::{DatabaseDriver, RowSink};
