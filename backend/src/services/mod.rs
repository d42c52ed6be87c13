pub mod clock;
pub mod quote_cache;
pub mod quote_service;
pub mod valuation_service;

#[cfg(test)]
pub(crate) mod test_support;
