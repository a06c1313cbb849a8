pub mod diagnostics;
pub mod driver;
pub mod language;

#[cfg(test)]
mod tests;
