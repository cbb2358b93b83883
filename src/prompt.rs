//! # prompt — renders the payload into the model prompt
//!
//! The model gets the whole [`Payload`] as pretty JSON plus the reply schema it
//! must follow, one decision object per symbol. Parsing the reply happens
//! elsewhere.

use crate::engine::AssemblerConfig;
use crate::models::Payload;

/// Build the prompt for one cycle.
pub fn build_prompt(payload: &Payload, config: &AssemblerConfig) -> String {
    let payload_json = payload.to_json_pretty();
    let now = &payload.meta.now;
    let venue = &payload.meta.exchange;

    let example_symbol = payload
        .symbols
        .first()
        .map(|s| s.market.replace('/', ""))
        .unwrap_or_else(|| format!("BTC{}", config.quote_asset));

    let risk = &config.risk;
    let min_pct = risk.min_position_percent;
    let max_pct = risk.max_position_percent;
    let stop_loss = risk.stop_loss_default_percent;
    let take_profit = risk.take_profit_default_percent;

    format!(r#"You are a professional intraday futures trader on {venue}.
Below is structured market data (JSON) for several symbols. Analyze each symbol
and reply with ONE decision object per symbol, keyed by the exchange symbol.

**CRITICAL**: Respond with ONLY a valid JSON object. No explanations, no markdown, no code fences.

## Required JSON Format
```
{{
  "{example_symbol}": {{
    "action": "BUY_OPEN" | "SELL_OPEN" | "CLOSE" | "REDUCE" | "HOLD",
    "reason": "<1-2 sentences citing the key indicators and values>",
    "confidence": <float 0.0 - 1.0>,
    "leverage": <int 1 - 100>,
    "open_percent": <float {min_pct} - {max_pct}>,
    "reduce_percent": <float 0 - 100>,
    "take_profit_percent": <float, e.g. {take_profit}>,
    "stop_loss_percent": <float, e.g. -{stop_loss}>
  }},
  "...": {{ ... }}
}}
```

## Rules
1. Use HOLD when risk is high or the trend is unclear
2. BUY_OPEN / SELL_OPEN must carry sensible take-profit and stop-loss percentages
3. REDUCE only applies to an open position; set reduce_percent
4. Every series in market_data (rsi, macd, histogram, kdj, boll, ohlc) is ordered oldest → newest
5. decision_history under each symbol is your own past verdicts, oldest → newest; stay consistent with open positions

## Current Time
{now}

## Account Rules (reference)
- Min position: {min_pct}%
- Max position: {max_pct}%
- Default stop loss: -{stop_loss}%
- Default take profit: +{take_profit}%

## Market Data JSON
{payload_json}

Respond with JSON only:"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InstrumentContext, Meta};

    fn make_payload(markets: &[&str]) -> Payload {
        Payload {
            meta: Meta {
                now: "2025-03-01 12:00:00".to_string(),
                exchange: "Binance Perp (USDT-M)".to_string(),
            },
            account: None,
            symbols: markets
                .iter()
                .map(|m| InstrumentContext {
                    market: m.to_string(),
                    funding: 0.0001,
                    open_interest: 1000.0,
                    current_price: 3000.5,
                    position: None,
                    market_data: Vec::new(),
                    decision_history: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_prompt_embeds_payload_and_rules() {
        let payload = make_payload(&["ETH/USDT"]);
        let prompt = build_prompt(&payload, &AssemblerConfig::default());

        assert!(prompt.contains("\"ETHUSDT\": {"));
        assert!(prompt.contains(&payload.to_json_pretty()));
        assert!(prompt.contains("2025-03-01 12:00:00"));
        assert!(prompt.contains("Max position: 30%"));
        assert!(prompt.contains("Default stop loss: -2%"));
        assert!(prompt.contains("\"REDUCE\""));
        assert!(prompt.ends_with("Respond with JSON only:"));
    }

    #[test]
    fn test_prompt_without_symbols_uses_quote_asset() {
        let prompt = build_prompt(&make_payload(&[]), &AssemblerConfig::default());
        assert!(prompt.contains("\"BTCUSDT\": {"));
    }
}
