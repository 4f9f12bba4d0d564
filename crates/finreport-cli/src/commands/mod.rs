pub mod answers;
pub mod generate;
pub mod inspect;
