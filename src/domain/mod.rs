pub mod ast;
pub mod candle;
pub mod error;
pub mod indicator;
pub mod interpreter;
pub mod lexer;
pub mod market;
pub mod parser;
pub mod session;
pub mod token;
pub mod trading;
pub mod validate;
