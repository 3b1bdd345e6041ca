pub mod stack;

pub use stack::StackConfig;
