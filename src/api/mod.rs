pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod marks;
pub(crate) mod reports;
pub(crate) mod router;

#[cfg(test)]
mod tests;
