mod tool;

pub use tool::main;
