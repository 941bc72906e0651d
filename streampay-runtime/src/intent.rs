//! Natural-language intent parser.
//!
//! Classification runs over a prioritized rule table; every rule that
//! matches is scored with [`score`] and the single best match wins (ties
//! keep the earlier rule). Parameters come from generic regex extraction,
//! overridden by a rule's named capture groups.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::registry::Registry;
use crate::types::{IntentKind, ParsedIntent};
use crate::validation::DurationUnit;

/// Base confidence for any structural match.
pub const BASE_CONFIDENCE: f64 = 0.6;
/// A match must score strictly above this to be accepted.
pub const ACCEPT_THRESHOLD: f64 = 0.5;
/// Inputs longer than this many words are penalized as ambiguous.
pub const MAX_UNAMBIGUOUS_WORDS: usize = 30;

const ADDRESS_BOOST: f64 = 0.15;
const AMOUNT_BOOST: f64 = 0.1;
const TOKEN_BOOST: f64 = 0.1;
const LENGTH_PENALTY: f64 = 0.1;

pub const DEFAULT_SYMBOLS: &[&str] = &[
    "USDC", "USDT", "DAI", "ETH", "WETH", "WBTC", "MATIC", "WMATIC", "ARB", "OP", "LINK", "UNI",
];

static ADDRESS_IN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b0x[0-9a-f]{40}\b").expect("valid address regex"));

static HEX_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b0x[0-9a-f]+\b").expect("valid hex literal regex"));

static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(pool|stream|flujo)\s*(?:id\s*)?(?:#\s*)?(0x[0-9a-f]+|\d+)\b")
        .expect("valid identifier regex")
});

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+(?:\.\d+)?)\s*(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?|wks?|months?|years?|yrs?|segundos?|minutos?|horas?|d[ií]as?|semanas?|mes(?:es)?|a[ñn]os?)\b",
    )
    .expect("valid duration regex")
});

/// `<number> [token] per second`, the only phrasing read as a stream rate.
static RATE_PER_SECOND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+(?:\.\d+)?)\s*(?:[a-z]+\s*)?(?:/\s*s(?:ec(?:ond)?)?|(?:per|every|each|a|por)\s+(?:seconds?|secs?|segundos?))\b",
    )
    .expect("valid rate regex")
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,3}(?:,\d{3})+(?:\.\d+)?\b|\b\d+(?:\.\d+)?\b").expect("valid number regex")
});

/// One entry of the classification table.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub name: &'static str,
    pub kind: IntentKind,
    pub pattern: Regex,
    pub base_confidence: f64,
    /// Named capture group → parameter key.
    pub captures: &'static [(&'static str, &'static str)],
}

impl IntentRule {
    fn new(
        name: &'static str,
        kind: IntentKind,
        pattern: &str,
        captures: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            name,
            kind,
            pattern: Regex::new(pattern).expect("valid intent rule regex"),
            base_confidence: BASE_CONFIDENCE,
            captures,
        }
    }
}

const SWAP_CAPTURES: &[(&str, &str)] = &[
    ("amount", "amount"),
    ("token_in", "tokenIn"),
    ("token_out", "tokenOut"),
];

const ADD_LIQUIDITY_CAPTURES: &[(&str, &str)] = &[
    ("amount0", "amount0"),
    ("amount1", "amount1"),
    ("pool_id", "poolId"),
];

static DEFAULT_RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    use IntentKind::*;
    vec![
        IntentRule::new(
            "create_stream.verb",
            CreateStream,
            r"\b(?:create|start|open|set\s+up|setup|begin|make|new)\b.*\bstream",
            &[],
        ),
        IntentRule::new(
            "create_stream.pay_over_time",
            CreateStream,
            r"\b(?:pay|send|stream)\b.*\b(?:per|every|each|a)\s+(?:second|minute|hour|day|week|month|year)\b",
            &[],
        ),
        IntentRule::new(
            "create_stream.es",
            CreateStream,
            r"\b(?:crear|crea|iniciar|inicia|abrir)\b.*\b(?:stream|flujo)",
            &[],
        ),
        IntentRule::new(
            "claim_stream.verb",
            ClaimStream,
            r"\b(?:claim|withdraw|collect|redeem)\b.*\bstream",
            &[],
        ),
        IntentRule::new(
            "claim_stream.es",
            ClaimStream,
            r"\b(?:reclamar|reclama|retirar|retira|cobrar)\b.*\b(?:stream|flujo)",
            &[],
        ),
        IntentRule::new(
            "cancel_stream.verb",
            CancelStream,
            r"\b(?:cancel|stop|terminate|end|close|kill)\b.*\bstream",
            &[],
        ),
        IntentRule::new(
            "cancel_stream.es",
            CancelStream,
            r"\b(?:cancelar|cancela|detener|terminar)\b.*\b(?:stream|flujo)",
            &[],
        ),
        IntentRule::new(
            "pause_stream.verb",
            PauseStream,
            r"\b(?:pause|suspend|freeze|hold)\b.*\bstream",
            &[],
        ),
        IntentRule::new(
            "pause_stream.es",
            PauseStream,
            r"\b(?:pausar|pausa|suspender)\b.*\b(?:stream|flujo)",
            &[],
        ),
        IntentRule::new(
            "list_streams.verb",
            ListStreams,
            r"\b(?:list|show|view|display|see|get)\b.*\bstreams\b",
            &[],
        ),
        IntentRule::new("list_streams.mine", ListStreams, r"\bmy\s+streams\b", &[]),
        IntentRule::new(
            "list_streams.es",
            ListStreams,
            r"\b(?:mis|ver|listar|mostrar)\b.*\b(?:streams|flujos)\b",
            &[],
        ),
        IntentRule::new(
            "swap_tokens.explicit",
            SwapTokens,
            r"\b(?:swap|exchange|trade|convert)\s+(?P<amount>\d+(?:\.\d+)?)\s*(?P<token_in>[a-z][a-z0-9]*)\s+(?:for|to|into|por)\s+(?P<token_out>[a-z][a-z0-9]*)\b",
            SWAP_CAPTURES,
        ),
        IntentRule::new(
            "swap_tokens.verb",
            SwapTokens,
            r"\b(?:swap|exchange|trade|convert)\b",
            &[],
        ),
        IntentRule::new(
            "swap_tokens.es",
            SwapTokens,
            r"\b(?:intercambiar|intercambia|cambiar|cambia)\b",
            &[],
        ),
        IntentRule::new(
            "add_liquidity.explicit",
            AddLiquidity,
            r"\badd\s+(?P<amount0>\d+(?:\.\d+)?)\s*(?:[a-z]+\s+)?and\s+(?P<amount1>\d+(?:\.\d+)?)\s*(?:[a-z]+\s+)?(?:to|into)\s+pool\s*#?\s*(?P<pool_id>\d+)\b",
            ADD_LIQUIDITY_CAPTURES,
        ),
        IntentRule::new(
            "add_liquidity.verb",
            AddLiquidity,
            r"\b(?:add|provide|deposit|supply)\b.*\bliquidity\b",
            &[],
        ),
        IntentRule::new(
            "add_liquidity.es",
            AddLiquidity,
            r"\b(?:añadir|agregar|aportar)\b.*\bliquidez\b",
            &[],
        ),
        IntentRule::new(
            "remove_liquidity.verb",
            RemoveLiquidity,
            r"\b(?:remove|withdraw|pull|take\s+out)\b.*\b(?:liquidity|shares)\b",
            &[],
        ),
        IntentRule::new(
            "remove_liquidity.es",
            RemoveLiquidity,
            r"\b(?:retirar|quitar|remover)\b.*\bliquidez\b",
            &[],
        ),
        IntentRule::new(
            "list_pools.verb",
            ListPools,
            r"\b(?:list|show|view|display|see|get|ver|listar|mostrar)\b.*\b(?:pools|piscinas)\b",
            &[],
        ),
        IntentRule::new("check_balance.word", CheckBalance, r"\b(?:balance|balances|saldo)\b", &[]),
        IntentRule::new(
            "check_balance.how_much",
            CheckBalance,
            r"\bhow\s+much\b.*\b(?:have|own|hold)\b",
            &[],
        ),
    ]
});

/// Observable features of the input that adjust a rule's base confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub has_address: bool,
    pub has_amount: bool,
    pub has_token: bool,
    pub word_count: usize,
}

/// Confidence for a structural match with base `base` under `signals`.
pub fn score(base: f64, signals: &Signals) -> f64 {
    let mut confidence = base;
    if signals.has_address {
        confidence += ADDRESS_BOOST;
    }
    if signals.has_amount {
        confidence += AMOUNT_BOOST;
    }
    if signals.has_token {
        confidence += TOKEN_BOOST;
    }
    if signals.word_count > MAX_UNAMBIGUOUS_WORDS {
        confidence -= LENGTH_PENALTY;
    }
    confidence.clamp(0.0, 1.0)
}

/// Raw values pulled out of the text before any rule is consulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    /// Account addresses in original letter case, in order of appearance.
    pub addresses: Vec<String>,
    /// Numbers with addresses, durations and per-second rates masked.
    pub numbers: Vec<String>,
    /// Numbers with `pool N` / `stream N` identifiers masked as well.
    pub numbers_without_ids: Vec<String>,
    /// Known token symbols, upper-cased, in order of appearance.
    pub symbols: Vec<String>,
    pub duration: Option<(String, DurationUnit)>,
    /// Number stated explicitly as a per-second rate.
    pub rate_per_second: Option<String>,
    pub pool_id: Option<String>,
    pub stream_id: Option<String>,
}

impl Extracted {
    fn numbers_for(&self, kind: IntentKind) -> &[String] {
        if uses_identifier(kind) {
            &self.numbers_without_ids
        } else {
            &self.numbers
        }
    }

    fn signals_for(&self, kind: IntentKind, word_count: usize) -> Signals {
        Signals {
            has_address: !self.addresses.is_empty(),
            has_amount: !self.numbers_for(kind).is_empty(),
            has_token: !self.symbols.is_empty(),
            word_count,
        }
    }
}

fn uses_identifier(kind: IntentKind) -> bool {
    matches!(
        kind,
        IntentKind::ClaimStream
            | IntentKind::CancelStream
            | IntentKind::PauseStream
            | IntentKind::AddLiquidity
            | IntentKind::RemoveLiquidity
    )
}

fn mask(re: &Regex, text: &str) -> String {
    re.replace_all(text, " ").into_owned()
}

fn collect_numbers(text: &str) -> Vec<String> {
    NUMBER_RE
        .find_iter(text)
        .map(|m| m.as_str().replace(',', ""))
        .collect()
}

#[derive(Debug, Clone)]
pub struct IntentParser {
    rules: Vec<IntentRule>,
    symbols: BTreeSet<String>,
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::with_symbols(DEFAULT_SYMBOLS.iter().copied())
    }
}

impl IntentParser {
    pub fn with_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rules: DEFAULT_RULES.clone(),
            symbols: symbols
                .into_iter()
                .map(|s| s.as_ref().trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Default symbols plus every symbol listed in the registry.
    pub fn from_registry(registry: &Registry) -> Self {
        let symbols = DEFAULT_SYMBOLS
            .iter()
            .map(|s| s.to_string())
            .chain(registry.known_symbols());
        Self::with_symbols(symbols)
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn knows_symbol(&self, symbol: &str) -> bool {
        self.symbols.contains(&symbol.to_uppercase())
    }

    /// Pull addresses, numbers, symbols, durations and identifiers out of
    /// `original` (trimmed user text) and its lower-cased form.
    pub fn extract(&self, original: &str, normalized: &str) -> Extracted {
        let addresses = ADDRESS_IN_TEXT_RE
            .find_iter(original)
            .map(|m| m.as_str().to_string())
            .collect();

        let duration = DURATION_RE.captures(normalized).and_then(|caps| {
            let unit = DurationUnit::from_word(&caps[2])?;
            Some((caps[1].to_string(), unit))
        });

        let mut pool_id = None;
        let mut stream_id = None;
        for caps in ID_RE.captures_iter(normalized) {
            let slot = if &caps[1] == "pool" {
                &mut pool_id
            } else {
                &mut stream_id
            };
            if slot.is_none() {
                *slot = Some(caps[2].to_string());
            }
        }

        let without_hex = mask(&HEX_LITERAL_RE, normalized);
        let rate_per_second = RATE_PER_SECOND_RE
            .captures(&without_hex)
            .map(|caps| caps[1].to_string());
        let without_rates = mask(&RATE_PER_SECOND_RE, &without_hex);
        let without_durations = mask(&DURATION_RE, &without_rates);
        let numbers = collect_numbers(&without_durations);
        let numbers_without_ids = collect_numbers(&mask(&ID_RE, &without_durations));

        let symbols = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_uppercase)
            .filter(|word| self.symbols.contains(word))
            .collect();

        Extracted {
            addresses,
            numbers,
            numbers_without_ids,
            symbols,
            duration,
            rate_per_second,
            pool_id,
            stream_id,
        }
    }

    /// Classify `text`. Never fails: unmatched input is `UNKNOWN` with
    /// confidence 0.
    pub fn parse_intent(&self, text: &str) -> ParsedIntent {
        let original = text.trim();
        let normalized = original.to_lowercase();
        if normalized.is_empty() {
            return ParsedIntent::unknown(original, "empty input");
        }

        let word_count = normalized.split_whitespace().count();
        let extracted = self.extract(original, &normalized);

        let mut best: Option<(&IntentRule, Captures<'_>, f64, Signals)> = None;
        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(&normalized) else {
                continue;
            };
            let signals = extracted.signals_for(rule.kind, word_count);
            let confidence = score(rule.base_confidence, &signals);
            if best.as_ref().is_none_or(|(_, _, c, _)| confidence > *c) {
                best = Some((rule, caps, confidence, signals));
            }
        }

        let Some((rule, caps, confidence, signals)) = best else {
            tracing::debug!(words = word_count, "no intent rule matched");
            return ParsedIntent::unknown(original, "no intent rule matched");
        };

        let reasoning = format!(
            "rule '{}' matched {}: base {:.2}, address={}, amount={}, token={}, words={} -> {:.2}",
            rule.name,
            rule.kind,
            rule.base_confidence,
            signals.has_address,
            signals.has_amount,
            signals.has_token,
            signals.word_count,
            confidence,
        );

        if confidence <= ACCEPT_THRESHOLD {
            tracing::debug!(rule = rule.name, confidence, "intent match below threshold");
            return ParsedIntent::unknown(original, format!("{reasoning} (below threshold)"));
        }

        let mut parameters = assign_parameters(rule.kind, &extracted);
        for (group, key) in rule.captures {
            if let Some(m) = caps.name(group) {
                parameters.insert((*key).to_string(), m.as_str().to_string());
            }
        }
        normalize_symbol_parameters(&mut parameters);

        tracing::debug!(
            intent_kind = %rule.kind,
            rule = rule.name,
            confidence,
            parameters = parameters.len(),
            "intent parsed"
        );

        ParsedIntent {
            intent_kind: rule.kind,
            confidence,
            parameters,
            original_text: original.to_string(),
            reasoning,
        }
    }
}

fn assign_parameters(kind: IntentKind, extracted: &Extracted) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let mut put = |key: &str, value: Option<&String>| {
        if let Some(v) = value {
            params.insert(key.to_string(), v.clone());
        }
    };
    let numbers = extracted.numbers_for(kind);

    match kind {
        IntentKind::CreateStream => {
            put("recipient", extracted.addresses.first());
            put(
                "token",
                extracted
                    .symbols
                    .first()
                    .or_else(|| extracted.addresses.get(1)),
            );
            put("amount", numbers.first());
            put("ratePerSecond", extracted.rate_per_second.as_ref());
            if let Some((value, unit)) = &extracted.duration {
                put("duration", Some(value));
                put("durationUnit", Some(&unit.as_str().to_string()));
            }
        }
        IntentKind::ClaimStream | IntentKind::CancelStream | IntentKind::PauseStream => {
            put("streamId", extracted.stream_id.as_ref());
        }
        IntentKind::SwapTokens => {
            let mut tokens = extracted
                .symbols
                .iter()
                .chain(extracted.addresses.iter());
            put("tokenIn", tokens.next());
            put("tokenOut", tokens.next());
            put("amount", numbers.first());
        }
        IntentKind::AddLiquidity => {
            put("poolId", extracted.pool_id.as_ref());
            put("amount0", numbers.first());
            put("amount1", numbers.get(1));
            put("token0", extracted.symbols.first());
            put("token1", extracted.symbols.get(1));
        }
        IntentKind::RemoveLiquidity => {
            put("poolId", extracted.pool_id.as_ref());
            put("shares", numbers.first());
        }
        IntentKind::CheckBalance => {
            put("token", extracted.symbols.first());
        }
        IntentKind::ListStreams | IntentKind::ListPools | IntentKind::Unknown => {}
    }
    params
}

fn normalize_symbol_parameters(params: &mut BTreeMap<String, String>) {
    for key in ["token", "tokenIn", "tokenOut", "token0", "token1"] {
        if let Some(value) = params.get_mut(key) {
            if !value.starts_with("0x") {
                *value = value.to_uppercase();
            }
        }
    }
}

/// Parameters that must be present for `kind` to be actionable.
pub fn required_parameters(kind: IntentKind) -> &'static [&'static str] {
    match kind {
        IntentKind::CreateStream => &["recipient", "token", "amount", "duration"],
        IntentKind::ClaimStream | IntentKind::CancelStream | IntentKind::PauseStream => {
            &["streamId"]
        }
        IntentKind::SwapTokens => &["tokenIn", "tokenOut", "amount"],
        IntentKind::AddLiquidity => &["poolId", "amount0", "amount1"],
        IntentKind::RemoveLiquidity => &["poolId", "shares"],
        IntentKind::ListStreams
        | IntentKind::ListPools
        | IntentKind::CheckBalance
        | IntentKind::Unknown => &[],
    }
}

/// Names of required parameters `parsed` is missing.
pub fn missing_parameters(parsed: &ParsedIntent) -> Vec<&'static str> {
    required_parameters(parsed.intent_kind)
        .iter()
        .copied()
        .filter(|key| {
            parsed
                .parameters
                .get(*key)
                .is_none_or(|v| v.trim().is_empty())
        })
        .collect()
}

/// `true` when every required parameter is present. `UNKNOWN` never validates.
pub fn validate_intent(parsed: &ParsedIntent) -> bool {
    parsed.intent_kind != IntentKind::Unknown && missing_parameters(parsed).is_empty()
}

pub fn intent_description(parsed: &ParsedIntent) -> &'static str {
    describe_kind(parsed.intent_kind)
}

pub fn describe_kind(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::CreateStream => "Create a payment stream",
        IntentKind::ClaimStream => "Claim funds from a payment stream",
        IntentKind::CancelStream => "Cancel a payment stream",
        IntentKind::PauseStream => "Pause a payment stream",
        IntentKind::ListStreams => "List your payment streams",
        IntentKind::SwapTokens => "Swap tokens",
        IntentKind::AddLiquidity => "Add liquidity to a pool",
        IntentKind::RemoveLiquidity => "Remove liquidity from a pool",
        IntentKind::ListPools => "List liquidity pools",
        IntentKind::CheckBalance => "Check token balance",
        IntentKind::Unknown => "Unrecognized request",
    }
}
