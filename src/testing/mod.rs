pub mod coordinator;

pub mod prelude;
