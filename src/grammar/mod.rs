pub mod grammar;
pub mod ll1_parsing_table;
pub mod nullable_first_follow;
pub mod parse;
pub mod pretty_print;
pub use grammar::Grammar;

pub const EPSILON: &str = "EPSILON";
pub const END_MARK: &str = "$";
