// Natural-language intent to structured search filters

pub mod filter;
pub mod translator;

pub use filter::{merge, SearchFilter, Sort};
pub use translator::QueryTranslator;
