pub mod decimal;
pub mod deposit;
pub mod errors;
pub mod quote;
pub mod units;

#[macro_use]
pub mod macros;

#[cfg(test)]
mod tests;
