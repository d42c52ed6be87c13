use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::services::quote_cache::QuoteCache;
use crate::services::quote_service::QuoteService;
use crate::services::valuation_service::ValuationService;

#[derive(Clone)]
pub struct AppState {
    pub valuation: Arc<ValuationService>,
    pub quotes: Arc<QuoteService>,
    pub quote_cache: Arc<QuoteCache>,
    pub tokens: Arc<TokenVerifier>,
}
