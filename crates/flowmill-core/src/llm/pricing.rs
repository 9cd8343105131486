//! Cost estimation for LLM usage.
//!
//! A hardcoded pricing table keyed by provider and model prefix, with a
//! conservative fallback for unknown models. Estimates are approximate and
//! formatted with a leading `~`.

use flowmill_types::agent::LlmProviderKind;

struct PricingEntry {
    provider: LlmProviderKind,
    model_prefix: &'static str,
    input_cost_per_million: f64,
    output_cost_per_million: f64,
}

/// Conservative fallback when no model prefix matches.
const FALLBACK_INPUT_COST: f64 = 5.0;
const FALLBACK_OUTPUT_COST: f64 = 15.0;

/// USD per million tokens, approximate as of early 2026. More specific
/// prefixes must precede their generic counterparts.
const PRICING_TABLE: &[PricingEntry] = &[
    PricingEntry {
        provider: LlmProviderKind::Anthropic,
        model_prefix: "claude-sonnet-4",
        input_cost_per_million: 3.0,
        output_cost_per_million: 15.0,
    },
    PricingEntry {
        provider: LlmProviderKind::Anthropic,
        model_prefix: "claude-opus-4",
        input_cost_per_million: 15.0,
        output_cost_per_million: 75.0,
    },
    PricingEntry {
        provider: LlmProviderKind::Anthropic,
        model_prefix: "claude-haiku-3",
        input_cost_per_million: 0.25,
        output_cost_per_million: 1.25,
    },
    PricingEntry {
        provider: LlmProviderKind::OpenAi,
        model_prefix: "gpt-4o-mini",
        input_cost_per_million: 0.15,
        output_cost_per_million: 0.60,
    },
    PricingEntry {
        provider: LlmProviderKind::OpenAi,
        model_prefix: "gpt-4o",
        input_cost_per_million: 2.50,
        output_cost_per_million: 10.0,
    },
    PricingEntry {
        provider: LlmProviderKind::Google,
        model_prefix: "gemini-2",
        input_cost_per_million: 1.25,
        output_cost_per_million: 5.0,
    },
];

/// Estimate the cost of one completion in USD.
///
/// The model is matched by prefix against the table; unknown models fall
/// back to $5.00 / $15.00 per million tokens.
pub fn estimate_cost(
    provider: LlmProviderKind,
    model: &str,
    input_tokens: u64,
    output_tokens: u64,
) -> f64 {
    for entry in PRICING_TABLE {
        if entry.provider == provider && model.starts_with(entry.model_prefix) {
            return compute_cost(
                input_tokens,
                output_tokens,
                entry.input_cost_per_million,
                entry.output_cost_per_million,
            );
        }
    }
    compute_cost(
        input_tokens,
        output_tokens,
        FALLBACK_INPUT_COST,
        FALLBACK_OUTPUT_COST,
    )
}

fn compute_cost(
    input_tokens: u64,
    output_tokens: u64,
    input_cost_per_million: f64,
    output_cost_per_million: f64,
) -> f64 {
    (input_tokens as f64 / 1_000_000.0) * input_cost_per_million
        + (output_tokens as f64 / 1_000_000.0) * output_cost_per_million
}

/// Format a cost estimate. Always prefixed with `~` to mark it as an
/// estimate; sub-cent values get three decimal places.
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 {
        format!("~${cost:.3}")
    } else {
        format!("~${cost:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_pricing() {
        // claude-sonnet-4: $3.00 input, $15.00 output per million
        let cost = estimate_cost(
            LlmProviderKind::Anthropic,
            "claude-sonnet-4-20250514",
            1_000_000,
            100_000,
        );
        assert!((cost - 4.50).abs() < 0.001, "expected ~$4.50, got ${cost}");
    }

    #[test]
    fn test_mini_matches_before_generic() {
        let cost = estimate_cost(LlmProviderKind::OpenAi, "gpt-4o-mini-2024", 1_000_000, 1_000_000);
        // mini: $0.15 + $0.60 = $0.75
        assert!((cost - 0.75).abs() < 0.001, "expected ~$0.75, got ${cost}");
    }

    #[test]
    fn test_unknown_model_uses_fallback() {
        let cost = estimate_cost(LlmProviderKind::Google, "unknown-model", 1_000_000, 100_000);
        let expected = 5.0 + 0.1 * 15.0;
        assert!((cost - expected).abs() < 0.001);
    }

    #[test]
    fn test_provider_must_match() {
        // A Claude model name under the wrong provider falls back.
        let cost = estimate_cost(LlmProviderKind::Google, "claude-sonnet-4", 1_000_000, 0);
        assert!((cost - FALLBACK_INPUT_COST).abs() < 0.001);
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(0.001), "~$0.001");
        assert_eq!(format_cost(0.12), "~$0.12");
        assert_eq!(format_cost(4.50), "~$4.50");
    }
}
