pub mod ast;
pub mod clauses;
pub mod errors;
pub mod extensions;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;
pub mod typecheck;
pub mod types;
