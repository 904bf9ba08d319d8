mod parser;
mod response;

pub use parser::parse_structured;
pub use response::StructuredOutput;
