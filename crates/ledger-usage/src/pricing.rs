//! Model pricing table and cost calculation.
//!
//! Rates are USD per million tokens. Model names coming from logs are reduced
//! to a canonical key (see [`normalize_model_name`]) and looked up exactly,
//! then by the longest table key that prefixes the canonical name, so dated
//! or suffixed variants such as `claude-opus-4-6-thinking` still resolve.
//! Unknown models have no pricing and cost nothing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::TokenUsage;

/// Model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cache_read_per_million: f64,
    pub cache_write_per_million: f64,
}

impl ModelPricing {
    /// Pricing with no cache rates.
    pub const fn new(input: f64, output: f64) -> Self {
        Self {
            input_per_million: input,
            output_per_million: output,
            cache_read_per_million: 0.0,
            cache_write_per_million: 0.0,
        }
    }

    /// Add cache rates: `creation` for cache writes, `read` for cache hits.
    pub const fn with_cache(mut self, creation: f64, read: f64) -> Self {
        self.cache_write_per_million = creation;
        self.cache_read_per_million = read;
        self
    }

    /// Calculate cost from token counts.
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.input_tokens as f64 * self.input_per_million / 1_000_000.0)
            + (usage.output_tokens as f64 * self.output_per_million / 1_000_000.0)
            + (usage.cache_read as f64 * self.cache_read_per_million / 1_000_000.0)
            + (usage.cache_write as f64 * self.cache_write_per_million / 1_000_000.0)
    }
}

/// Pricing keyed by canonical model name.
static PRICING: LazyLock<BTreeMap<&'static str, ModelPricing>> = LazyLock::new(|| {
    BTreeMap::from([
        // Anthropic Claude
        ("opus-4-6", ModelPricing::new(5.0, 25.0).with_cache(6.25, 0.50)),
        ("opus-4-5", ModelPricing::new(5.0, 25.0).with_cache(6.25, 0.50)),
        ("opus-4-1", ModelPricing::new(15.0, 75.0).with_cache(18.75, 1.50)),
        ("opus-4", ModelPricing::new(15.0, 75.0).with_cache(18.75, 1.50)),
        ("sonnet-4-5", ModelPricing::new(3.0, 15.0).with_cache(3.75, 0.30)),
        ("sonnet-4", ModelPricing::new(3.0, 15.0).with_cache(3.75, 0.30)),
        ("haiku-4-5", ModelPricing::new(0.80, 4.0).with_cache(1.0, 0.08)),
        ("3-7-sonnet", ModelPricing::new(3.0, 15.0).with_cache(3.75, 0.30)),
        ("3-5-sonnet", ModelPricing::new(3.0, 15.0).with_cache(3.75, 0.30)),
        ("3-5-haiku", ModelPricing::new(0.80, 4.0).with_cache(1.0, 0.08)),
        // OpenAI
        ("gpt-4o", ModelPricing::new(2.50, 10.0)),
        ("gpt-4o-mini", ModelPricing::new(0.15, 0.60)),
        ("gpt-4.1", ModelPricing::new(2.0, 8.0)),
        ("gpt-4.1-mini", ModelPricing::new(0.40, 1.60)),
        ("gpt-5", ModelPricing::new(1.25, 10.0)),
        ("gpt-5-mini", ModelPricing::new(0.25, 2.0)),
        ("gpt-5-codex", ModelPricing::new(1.25, 10.0)),
        ("o3", ModelPricing::new(10.0, 40.0)),
        ("o4-mini", ModelPricing::new(1.10, 4.40)),
        // Google Gemini
        ("gemini-2.5-pro", ModelPricing::new(1.25, 10.0)),
        ("gemini-2.5-flash", ModelPricing::new(0.30, 2.50)),
        ("gemini-2.5-flash-lite", ModelPricing::new(0.10, 0.40)),
        ("gemini-2.0-flash", ModelPricing::new(0.10, 0.40)),
    ])
});

/// Every canonical key in the pricing table.
pub fn known_models() -> impl Iterator<Item = &'static str> {
    PRICING.keys().copied()
}

/// Reduce a model name to its canonical pricing key.
///
/// Trims and lowercases, drops any `namespace/` prefix, the `claude-` vendor
/// prefix and a trailing `-YYYYMMDD` date. Repeats until nothing changes, so
/// `normalize_model_name(normalize_model_name(x)) == normalize_model_name(x)`.
pub fn normalize_model_name(name: &str) -> String {
    let mut current = name.to_string();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(name: &str) -> String {
    let mut name = name.trim().to_lowercase();

    if let Some(idx) = name.rfind('/') {
        name = name[idx + 1..].to_string();
    }
    if let Some(rest) = name.strip_prefix("claude-") {
        name = rest.to_string();
    }
    if let Some(stem) = strip_date_suffix(&name) {
        name = stem.to_string();
    }
    name
}

/// `Some(stem)` when `name` ends in `-` followed by exactly eight digits.
fn strip_date_suffix(name: &str) -> Option<&str> {
    let (stem, suffix) = name.rsplit_once('-')?;
    (suffix.len() == 8 && suffix.bytes().all(|b| b.is_ascii_digit())).then_some(stem)
}

/// Look up pricing for a model name.
///
/// Exact match on the canonical key first, then the longest table key that is
/// a prefix of it. `None` for unknown models.
pub fn get_pricing(model: &str) -> Option<ModelPricing> {
    let key = normalize_model_name(model);
    if let Some(pricing) = PRICING.get(key.as_str()) {
        return Some(*pricing);
    }
    PRICING
        .iter()
        .filter(|(k, _)| key.starts_with(*k))
        .max_by_key(|(k, _)| k.len())
        .map(|(_, pricing)| *pricing)
}

/// Cost of `usage` under `model`'s rates. Unknown models cost zero.
pub fn calculate_cost(model: &str, usage: &TokenUsage) -> f64 {
    get_pricing(model).map_or(0.0, |p| p.cost(usage))
}

/// Price an undivided token count at the model's output rate.
///
/// Used where a source only records a per-model total without the
/// input/output split.
pub fn calculate_output_cost(model: &str, tokens: u64) -> f64 {
    get_pricing(model).map_or(0.0, |p| tokens as f64 * p.output_per_million / 1_000_000.0)
}

/// Sum of per-model costs over a cumulative per-model usage table.
pub fn total_cost_from_model_usage(usage: &BTreeMap<String, TokenUsage>) -> f64 {
    usage
        .iter()
        .map(|(model, usage)| calculate_cost(model, usage))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_strips_prefixes_and_dates() {
        assert_eq!(normalize_model_name("claude-opus-4-6"), "opus-4-6");
        assert_eq!(normalize_model_name("claude-sonnet-4-5-20250929"), "sonnet-4-5");
        assert_eq!(normalize_model_name("models/gemini-2.5-pro"), "gemini-2.5-pro");
        assert_eq!(
            normalize_model_name("anthropic/claude-haiku-4-5-20251001"),
            "haiku-4-5"
        );
        assert_eq!(normalize_model_name("  GPT-4o  "), "gpt-4o");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let names = [
            "claude-opus-4-6",
            "claude-claude-opus-4-6-20250101-20250202",
            "a/b/claude-sonnet-4-5",
            " Models/Gemini-2.5-Flash ",
            "o3",
            "",
            "-12345678",
            "totally-unknown-model",
        ];
        for name in names {
            let once = normalize_model_name(name);
            assert_eq!(normalize_model_name(&once), once, "input: {name:?}");
        }
    }

    #[test]
    fn test_date_suffix_requires_eight_digits() {
        assert_eq!(normalize_model_name("model-1234567"), "model-1234567");
        assert_eq!(normalize_model_name("model-123456789"), "model-123456789");
        assert_eq!(normalize_model_name("model-2025012a"), "model-2025012a");
        assert_eq!(normalize_model_name("model-20250120"), "model");
    }

    #[test]
    fn test_exact_lookup() {
        let pricing = get_pricing("claude-opus-4-6").unwrap();
        assert_eq!(pricing.input_per_million, 5.0);
        assert_eq!(pricing.output_per_million, 25.0);
        assert_eq!(pricing.cache_read_per_million, 0.50);
        assert_eq!(pricing.cache_write_per_million, 6.25);
    }

    #[test]
    fn test_cache_rates_are_creation_then_read() {
        let pricing = ModelPricing::new(3.0, 15.0).with_cache(3.75, 0.30);
        assert_eq!(pricing.cache_write_per_million, 3.75);
        assert_eq!(pricing.cache_read_per_million, 0.30);
    }

    #[test]
    fn test_thinking_suffix_matches_base_key() {
        for key in known_models() {
            let thinking = format!("{key}-thinking");
            assert_eq!(get_pricing(&thinking), get_pricing(key), "key: {key}");
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        // "opus-4" and "opus-4-1" both prefix this name; the longer one applies
        let pricing = get_pricing("claude-opus-4-1-preview").unwrap();
        assert_eq!(pricing, get_pricing("opus-4-1").unwrap());

        let mini = get_pricing("gpt-4o-mini-2024-07-18").unwrap();
        assert_eq!(mini.input_per_million, 0.15);
    }

    #[test]
    fn test_unknown_model() {
        assert!(get_pricing("totally-unknown-model").is_none());
        let usage = TokenUsage::new(1_000_000, 1_000_000).with_cache(5, 5);
        assert_eq!(calculate_cost("totally-unknown-model", &usage), 0.0);
        assert_eq!(calculate_output_cost("totally-unknown-model", 1_000_000), 0.0);
    }

    #[test]
    fn test_cost_formula() {
        // 1M input at $3 + 1M output at $15 + 1M cache read at $0.30 + 1M cache write at $3.75
        let usage = TokenUsage::new(1_000_000, 1_000_000).with_cache(1_000_000, 1_000_000);
        assert!(approx_eq(calculate_cost("claude-sonnet-4-5", &usage), 22.05));

        // Models without cache rates ignore cache tokens
        let usage = TokenUsage::new(1_000_000, 0).with_cache(1_000_000, 0);
        assert!(approx_eq(calculate_cost("gpt-4o", &usage), 2.50));
    }

    #[test]
    fn test_cost_additivity() {
        let a = TokenUsage::new(1234, 5678).with_cache(91011, 1213);
        let b = TokenUsage::new(42, 7).with_cache(0, 999_999);
        for model in ["opus-4-6", "gpt-5-codex", "gemini-2.5-flash", "nope"] {
            let split = calculate_cost(model, &a) + calculate_cost(model, &b);
            let joined = calculate_cost(model, &(a + b));
            assert!(approx_eq(split, joined), "model: {model}");
        }
    }

    #[test]
    fn test_output_rate_cost() {
        assert!(approx_eq(calculate_output_cost("claude-opus-4-6", 2_000_000), 50.0));
    }

    #[test]
    fn test_total_cost_from_model_usage() {
        let mut usage = BTreeMap::new();
        usage.insert(
            "claude-opus-4-6".to_string(),
            TokenUsage::new(112_444, 958_448).with_cache(623_295_535, 44_469_146),
        );
        usage.insert("mystery".to_string(), TokenUsage::new(10, 10));

        let expected = 112_444.0 * 5.0 / 1e6
            + 958_448.0 * 25.0 / 1e6
            + 623_295_535.0 * 0.50 / 1e6
            + 44_469_146.0 * 6.25 / 1e6;
        assert!(approx_eq(total_cost_from_model_usage(&usage), expected));
        assert!((expected - 614.1).abs() < 1.0);
    }
}
