pub mod machine;
pub mod persister;
pub mod registry;
pub mod session;
pub mod undo;
