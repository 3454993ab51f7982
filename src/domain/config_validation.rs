//! Configuration validation.
//!
//! Validates all config fields before a backtest or simulation runs.

use crate::domain::applier::ConflictPolicy;
use crate::domain::backtest::Interval;
use crate::domain::error::TpslError;
use crate::domain::transaction::normalize_symbol;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TpslError> {
    validate_initial_money(config)?;
    validate_dates(config)?;
    validate_symbols(config)?;
    validate_interval(config)?;
    validate_conflict_policy(config)?;
    validate_prices_path(config)?;
    Ok(())
}

pub fn validate_rules_config(config: &dyn ConfigPort) -> Result<(), TpslError> {
    validate_threshold_pair(config, "take_profit_full", "take_profit_partial")?;
    validate_threshold_pair(config, "stop_loss_full", "stop_loss_partial")?;
    validate_partial_fraction(config)?;
    Ok(())
}

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), TpslError> {
    match config.get_string("ledger", "memory") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(TpslError::ConfigMissing {
                section: "ledger".to_string(),
                key: "memory".to_string(),
            });
        }
    }
    validate_symbols(config)?;
    validate_prices_path(config)?;
    validate_conflict_policy(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> TpslError {
    TpslError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_initial_money(config: &dyn ConfigPort) -> Result<(), TpslError> {
    if config.get_string("backtest", "initial_money").is_none() {
        return Err(TpslError::ConfigMissing {
            section: "backtest".to_string(),
            key: "initial_money".to_string(),
        });
    }
    let value = config.get_double("backtest", "initial_money", f64::NAN);
    if !(value > 0.0) || !value.is_finite() {
        return Err(invalid(
            "backtest",
            "initial_money",
            "initial_money must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TpslError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, TpslError> {
    match value {
        None => Err(TpslError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                &format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), TpslError> {
    let Some(raw) = config.get_string("backtest", "symbols") else {
        return Err(TpslError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbols".to_string(),
        });
    };
    parse_symbols(&raw).map(|_| ())
}

/// Split a comma list into upper-cased symbols, rejecting blanks and repeats.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, TpslError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let symbol = normalize_symbol(token);
        if symbol.is_empty() {
            return Err(invalid("backtest", "symbols", "empty symbol in list"));
        }
        if !seen.insert(symbol.clone()) {
            return Err(invalid(
                "backtest",
                "symbols",
                &format!("duplicate symbol: {}", symbol),
            ));
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), TpslError> {
    match config.get_string("backtest", "interval") {
        None => Ok(()),
        Some(s) if Interval::parse(&s).is_some() => Ok(()),
        Some(_) => Err(invalid(
            "backtest",
            "interval",
            "interval must be days or minutes",
        )),
    }
}

fn validate_conflict_policy(config: &dyn ConfigPort) -> Result<(), TpslError> {
    match config.get_string("backtest", "conflict_policy") {
        None => Ok(()),
        Some(s) if ConflictPolicy::parse(&s).is_some() => Ok(()),
        Some(_) => Err(invalid(
            "backtest",
            "conflict_policy",
            "conflict_policy must be take_profit_first, net or both",
        )),
    }
}

fn validate_prices_path(config: &dyn ConfigPort) -> Result<(), TpslError> {
    match config.get_string("data", "prices") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(TpslError::ConfigMissing {
            section: "data".to_string(),
            key: "prices".to_string(),
        }),
    }
}

fn validate_threshold_pair(
    config: &dyn ConfigPort,
    full_key: &str,
    partial_key: &str,
) -> Result<(), TpslError> {
    let full = config.get_double("rules", full_key, 0.3);
    let partial = config.get_double("rules", partial_key, 0.1);
    for (key, value) in [(full_key, full), (partial_key, partial)] {
        if !value.is_finite() {
            return Err(invalid("rules", key, &format!("{} must be a finite number", key)));
        }
    }
    if partial <= 0.0 {
        return Err(invalid(
            "rules",
            partial_key,
            &format!("{} must be positive", partial_key),
        ));
    }
    if full <= partial {
        return Err(invalid(
            "rules",
            full_key,
            &format!("{} must be greater than {}", full_key, partial_key),
        ));
    }
    Ok(())
}

fn validate_partial_fraction(config: &dyn ConfigPort) -> Result<(), TpslError> {
    let value = config.get_double("rules", "partial_fraction", 0.5);
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(
            "rules",
            "partial_fraction",
            "partial_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}
