//! Cumulative token usage ledger and cost estimation
//!
//! Counters are kept per provider and model, persisted as JSON under
//! `token_usage_data`, and only ever grow until [`UsageLedger::reset`].
//! Cost is derived on demand from a static per-1K-token price table.

use crate::backend::{ChatResponse, Usage};
use crate::storage::{KeyValueStore, StorageError, TOKEN_USAGE_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Price per 1000 tokens (USD)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price {
    pub input: f64,
    pub output: f64,
}

const fn price(input: f64, output: f64) -> Price {
    Price { input, output }
}

/// Provider -> [(model, price)]; `default` rows apply to unlisted models
const PRICE_TABLE: &[(&str, &[(&str, Price)])] = &[
    (
        "anthropic",
        &[
            ("claude-3-opus-20240229", price(15.0, 75.0)),
            ("claude-3-sonnet-20240229", price(3.0, 15.0)),
            ("claude-3-haiku-20240307", price(0.25, 1.25)),
            ("default", price(3.0, 15.0)),
        ],
    ),
    (
        "openai",
        &[
            ("gpt-4", price(30.0, 60.0)),
            ("gpt-4-turbo", price(10.0, 30.0)),
            ("gpt-3.5-turbo", price(0.5, 1.5)),
            ("default", price(10.0, 30.0)),
        ],
    ),
    (
        "google",
        &[
            ("gemini-pro", price(0.125, 0.375)),
            ("default", price(0.125, 0.375)),
        ],
    ),
];

/// Fallback for providers missing from the table
const DEFAULT_PRICE: Price = price(5.0, 15.0);

/// Look up a price: exact model, then the provider's default, then the
/// global default
pub fn price_for(provider: &str, model: &str) -> Price {
    let Some((_, models)) = PRICE_TABLE.iter().find(|(p, _)| *p == provider) else {
        return DEFAULT_PRICE;
    };
    models
        .iter()
        .find(|(m, _)| *m == model)
        .or_else(|| models.iter().find(|(m, _)| *m == "default"))
        .map(|(_, p)| *p)
        .unwrap_or(DEFAULT_PRICE)
}

/// Token counters for one model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub input: u64,
    pub output: u64,
}

impl ModelUsage {
    pub fn cost(&self, price: Price) -> f64 {
        (self.input as f64 / 1000.0) * price.input + (self.output as f64 / 1000.0) * price.output
    }
}

/// Aggregate over a ledger or a filtered view of it
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

/// Which providers a summary covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderFilter {
    #[default]
    All,
    Provider(String),
}

type UsageMap = BTreeMap<String, BTreeMap<String, ModelUsage>>;

/// Persistent provider -> model -> usage ledger
pub struct UsageLedger {
    store: Arc<dyn KeyValueStore>,
    data: UsageMap,
}

impl UsageLedger {
    /// Load the ledger; an unreadable stored value starts an empty ledger
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let data = match store.get(TOKEN_USAGE_KEY)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable token usage data");
                UsageMap::new()
            }),
            None => UsageMap::new(),
        };
        Ok(Self { store, data })
    }

    /// Add token counts for one call and persist the ledger
    pub fn record(
        &mut self,
        provider: &str,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Result<(), StorageError> {
        let provider = if provider.is_empty() { "unknown" } else { provider };
        let model = if model.is_empty() { "default" } else { model };

        let entry = self
            .data
            .entry(provider.to_string())
            .or_default()
            .entry(model.to_string())
            .or_default();
        entry.input += input_tokens;
        entry.output += output_tokens;

        let json = serde_json::to_string(&self.data)?;
        self.store.set(TOKEN_USAGE_KEY, &json)
    }

    /// Record the usage a chat response reports, attributed to the model the
    /// backend selected, else `fallback_model`. Returns false when the
    /// response carries no usage.
    pub fn record_response(
        &mut self,
        provider: &str,
        fallback_model: &str,
        response: &ChatResponse,
    ) -> Result<bool, StorageError> {
        let Some(Usage {
            input_tokens,
            output_tokens,
        }) = response.usage
        else {
            return Ok(false);
        };
        let model = response
            .selected_model
            .as_deref()
            .or(response.model.as_deref())
            .unwrap_or(fallback_model);
        debug!(provider, model, input_tokens, output_tokens, "Recording token usage");
        self.record(provider, model, input_tokens, output_tokens)?;
        Ok(true)
    }

    /// Drop all counters
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.data.clear();
        self.store.remove(TOKEN_USAGE_KEY)
    }

    /// Counters for one provider/model pair
    pub fn get(&self, provider: &str, model: &str) -> Option<ModelUsage> {
        self.data.get(provider).and_then(|m| m.get(model)).copied()
    }

    /// Provider names with recorded usage
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Rows of (provider, model, usage, cost) for display
    pub fn rows(&self, filter: &ProviderFilter) -> Vec<(String, String, ModelUsage, f64)> {
        self.data
            .iter()
            .filter(|(provider, _)| match filter {
                ProviderFilter::All => true,
                ProviderFilter::Provider(p) => p == *provider,
            })
            .flat_map(|(provider, models)| {
                models.iter().map(move |(model, usage)| {
                    let cost = usage.cost(price_for(provider, model));
                    (provider.clone(), model.clone(), *usage, cost)
                })
            })
            .collect()
    }

    /// Total tokens and cost for the selected providers
    pub fn totals(&self, filter: &ProviderFilter) -> UsageTotals {
        self.rows(filter)
            .into_iter()
            .fold(UsageTotals::default(), |mut acc, (_, _, usage, cost)| {
                acc.input_tokens += usage.input;
                acc.output_tokens += usage.output;
                acc.cost += cost;
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_price_lookup_fallbacks() {
        assert_eq!(price_for("openai", "gpt-4"), price(30.0, 60.0));
        assert_eq!(price_for("openai", "gpt-5"), price(10.0, 30.0));
        assert_eq!(price_for("mistral", "large"), DEFAULT_PRICE);
    }

    #[test]
    fn test_record_accumulates_and_persists() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut ledger = UsageLedger::load(store.clone()).unwrap();
        ledger.record("anthropic", "claude-3-haiku-20240307", 1000, 500).unwrap();
        ledger.record("anthropic", "claude-3-haiku-20240307", 1000, 500).unwrap();

        let reloaded = UsageLedger::load(store).unwrap();
        assert_eq!(
            reloaded.get("anthropic", "claude-3-haiku-20240307"),
            Some(ModelUsage { input: 2000, output: 1000 })
        );
    }

    #[test]
    fn test_empty_provider_and_model_fallbacks() {
        let mut ledger = UsageLedger::load(Arc::new(MemoryStore::new())).unwrap();
        ledger.record("", "", 10, 20).unwrap();
        assert_eq!(ledger.get("unknown", "default"), Some(ModelUsage { input: 10, output: 20 }));
    }

    #[test]
    fn test_totals_and_filter() {
        let mut ledger = UsageLedger::load(Arc::new(MemoryStore::new())).unwrap();
        ledger.record("openai", "gpt-4", 1000, 1000).unwrap();
        ledger.record("google", "gemini-pro", 2000, 0).unwrap();

        let all = ledger.totals(&ProviderFilter::All);
        assert_eq!(all.input_tokens, 3000);
        assert_eq!(all.output_tokens, 1000);
        assert!(approx(all.cost, 30.0 + 60.0 + 0.25));

        let openai = ledger.totals(&ProviderFilter::Provider("openai".to_string()));
        assert!(approx(openai.cost, 90.0));
        assert_eq!(openai.input_tokens, 1000);
    }

    #[test]
    fn test_record_response_prefers_selected_model() {
        let mut ledger = UsageLedger::load(Arc::new(MemoryStore::new())).unwrap();
        let response = ChatResponse {
            usage: Some(Usage {
                input_tokens: 10,
                output_tokens: 4,
            }),
            model: Some("gpt-4o".to_string()),
            selected_model: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        };
        assert!(ledger.record_response("openai", "default", &response).unwrap());
        assert_eq!(
            ledger.get("openai", "gpt-4o-mini"),
            Some(ModelUsage { input: 10, output: 4 })
        );
    }

    #[test]
    fn test_record_response_without_usage_is_skipped() {
        let mut ledger = UsageLedger::load(Arc::new(MemoryStore::new())).unwrap();
        let response = ChatResponse::default();
        assert!(!ledger.record_response("openai", "default", &response).unwrap());
        assert_eq!(ledger.providers().count(), 0);
    }

    #[test]
    fn test_reset_clears_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut ledger = UsageLedger::load(store.clone()).unwrap();
        ledger.record("openai", "gpt-4", 1, 1).unwrap();
        ledger.reset().unwrap();
        assert_eq!(store.get(TOKEN_USAGE_KEY).unwrap(), None);
        assert_eq!(ledger.totals(&ProviderFilter::All), UsageTotals::default());
    }

    #[test]
    fn test_corrupt_ledger_starts_empty() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(TOKEN_USAGE_KEY, "{not json").unwrap();
        let ledger = UsageLedger::load(store).unwrap();
        assert_eq!(ledger.providers().count(), 0);
    }
}
