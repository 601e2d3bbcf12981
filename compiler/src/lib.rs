// vcc — Vireo Compiler Collection
//
// Library root. Cost analysis and lane partitioning for Vireo designs.

pub mod ast;
pub mod cost;
pub mod cost_model;
pub mod diag;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod partition;
pub mod report;
