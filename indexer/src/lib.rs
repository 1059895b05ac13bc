pub mod corpus;
pub mod display;
