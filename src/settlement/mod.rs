//! # Settlement
//!
//! Turns a ledger snapshot plus the final chip counts into chip value,
//! per-player profit and a list of suggested payments.
//!
//! The payment suggestions come from a deterministic greedy pass: winners
//! and losers keep ledger order, every winner is matched against every
//! loser in turn, and each pair moves as much as both running balances
//! allow. It is not a fewest-transfers solver, but the output is stable for
//! a given ledger so it can be compared against earlier results.
//!
//! ```
//! use std::collections::HashMap;
//!
//! use poker_settle::ledger::{GameConfig, Ledger};
//! use poker_settle::settlement::calculate;
//!
//! let config = GameConfig::new(100, 20.0).unwrap();
//! let mut ledger = Ledger::new();
//! let alice = ledger.add_player("Alice").unwrap();
//! let bob = ledger.add_player("Bob").unwrap();
//! ledger.add_buyin(alice, &config).unwrap();
//! ledger.add_buyin(alice, &config).unwrap();
//! ledger.add_buyin(bob, &config).unwrap();
//!
//! let finals = HashMap::from([(alice, 250), (bob, 50)]);
//! let result = calculate(ledger.players(), &config, &finals).unwrap();
//!
//! assert_eq!(result.payments.len(), 1);
//! assert_eq!(result.payments[0].to_string(), "Bob pays Alice $10.00");
//! ```
mod result;

pub use result::{Payment, PlayerResult, SettlementResult};

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::core::PlayerId;
use crate::errors::SettlementError;
use crate::ledger::{GameConfig, Player};

/// Transfers at or below one cent are dropped.
pub const PAYMENT_THRESHOLD: f64 = 0.01;

/// Settle a game.
///
/// # Arguments
///
/// * `players` - The ledger's players, in ledger order.
/// * `config` - The buy-in unit used for every buy-in.
/// * `final_chips` - Final chip count for every player. A missing player is
///   an error rather than zero chips.
///
/// # Errors
///
/// * [`SettlementError::IncompleteSettlementInput`] for the first player
///   without a final count.
/// * [`SettlementError::NoChipsInPlay`] when nobody bought in.
/// * [`SettlementError::Overflow`] when the totals in play don't fit.
#[instrument(level = "debug", skip_all, fields(num_players = players.len()))]
pub fn calculate(
    players: &[Player],
    config: &GameConfig,
    final_chips: &HashMap<PlayerId, u64>,
) -> Result<SettlementResult, SettlementError> {
    if let Some(missing) = players.iter().find(|p| !final_chips.contains_key(&p.id)) {
        return Err(SettlementError::IncompleteSettlementInput { player: missing.id });
    }

    let total_buyins: u64 = players.iter().map(|p| p.buyin_count as u64).sum();
    let total_chips_in_play = total_buyins
        .checked_mul(config.chips_per_buyin)
        .ok_or(SettlementError::Overflow)?;
    let total_dollars_in_play = config
        .dollars_per_buyin
        .checked_mul(total_buyins)
        .ok_or(SettlementError::Overflow)?;

    if total_chips_in_play == 0 {
        return Err(SettlementError::NoChipsInPlay);
    }

    // Computed once and kept unrounded so per-player values don't
    // accumulate rounding error.
    let chip_value = total_dollars_in_play.as_dollars() / total_chips_in_play as f64;

    let player_results: Vec<PlayerResult> = players
        .iter()
        .map(|p| {
            let chips = final_chips[&p.id];
            let final_value = chips as f64 * chip_value;
            PlayerResult {
                player_id: p.id,
                name: p.name.clone(),
                buyins: p.buyin_count,
                total_spent: p.total_spent,
                final_chips: chips,
                final_value,
                profit: final_value - p.total_spent.as_dollars(),
            }
        })
        .collect();

    let payments = suggest_payments(&player_results);

    debug!(
        total_buyins,
        total_chips_in_play,
        chip_value,
        num_payments = payments.len(),
        "Settlement calculated"
    );

    Ok(SettlementResult {
        total_buyins,
        total_chips_in_play,
        total_dollars_in_play,
        chip_value,
        players: player_results,
        payments,
    })
}

/// Greedy winner-by-loser pass over running balances.
fn suggest_payments(results: &[PlayerResult]) -> Vec<Payment> {
    let winners: Vec<&PlayerResult> = results.iter().filter(|r| r.profit > 0.0).collect();
    let losers: Vec<&PlayerResult> = results.iter().filter(|r| r.profit < 0.0).collect();

    let mut owed: Vec<f64> = losers.iter().map(|l| -l.profit).collect();
    let mut payments = Vec::new();

    for winner in winners {
        let mut surplus = winner.profit;
        for (loser, deficit) in losers.iter().zip(owed.iter_mut()) {
            let amount = surplus.min(*deficit);
            if amount > PAYMENT_THRESHOLD {
                payments.push(Payment {
                    from: loser.player_id,
                    from_name: loser.name.clone(),
                    to: winner.player_id,
                    to_name: winner.name.clone(),
                    amount,
                });
                surplus -= amount;
                *deficit -= amount;
            }
        }
    }

    payments
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::Cents;
    use crate::ledger::Ledger;

    /// Build a ledger where each entry is (name, buyins).
    fn ledger(config: &GameConfig, seats: &[(&str, u32)]) -> (Ledger, Vec<PlayerId>) {
        let mut ledger = Ledger::new();
        let mut ids = vec![];
        for (name, buyins) in seats {
            let id = ledger.add_player(name).unwrap();
            for _ in 0..*buyins {
                ledger.add_buyin(id, config).unwrap();
            }
            ids.push(id);
        }
        (ledger, ids)
    }

    fn finals(ids: &[PlayerId], chips: &[u64]) -> HashMap<PlayerId, u64> {
        ids.iter().copied().zip(chips.iter().copied()).collect()
    }

    #[test]
    fn test_two_player_example() {
        let config = GameConfig::new(100, 20.0).unwrap();
        let (ledger, ids) = ledger(&config, &[("Alice", 2), ("Bob", 1)]);

        let result = calculate(ledger.players(), &config, &finals(&ids, &[250, 50])).unwrap();

        assert_eq!(result.total_buyins, 3);
        assert_eq!(result.total_chips_in_play, 300);
        assert_eq!(result.total_dollars_in_play, Cents::new(6000));
        assert_abs_diff_eq!(result.chip_value, 0.20, epsilon = 1e-12);

        let alice = result.player(ids[0]).unwrap();
        assert_abs_diff_eq!(alice.final_value, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(alice.profit, 10.0, epsilon = 1e-9);
        let bob = result.player(ids[1]).unwrap();
        assert_abs_diff_eq!(bob.final_value, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bob.profit, -10.0, epsilon = 1e-9);

        assert_eq!(result.payments.len(), 1);
        assert_eq!(result.payments[0].from, ids[1]);
        assert_eq!(result.payments[0].to, ids[0]);
        assert_eq!(result.payments[0].to_string(), "Bob pays Alice $10.00");
        assert!(result.is_zero_sum());
    }

    #[test]
    fn test_missing_final_count_is_an_error() {
        let config = GameConfig::default();
        let (ledger, ids) = ledger(&config, &[("Alice", 1), ("Bob", 1)]);
        let partial = finals(&ids[..1], &[200]);

        assert_eq!(
            calculate(ledger.players(), &config, &partial),
            Err(SettlementError::IncompleteSettlementInput { player: ids[1] })
        );
    }

    #[test]
    fn test_no_chips_in_play() {
        let config = GameConfig::default();
        let (ledger, ids) = ledger(&config, &[("Alice", 0), ("Bob", 0)]);
        assert_eq!(
            calculate(ledger.players(), &config, &finals(&ids, &[0, 0])),
            Err(SettlementError::NoChipsInPlay)
        );

        let vacuous = SettlementResult::vacuous(ledger.players());
        assert_eq!(vacuous.chip_value, 0.0);
        assert!(vacuous.payments.is_empty());
        assert_eq!(vacuous.players.len(), 2);
    }

    #[test]
    fn test_empty_table_has_no_chips() {
        let config = GameConfig::default();
        assert_eq!(
            calculate(&[], &config, &HashMap::new()),
            Err(SettlementError::NoChipsInPlay)
        );
    }

    #[test]
    fn test_greedy_pass_keeps_player_order_and_running_balances() {
        // 10 chips per $10 buy-in keeps chip value at exactly $1.
        let config = GameConfig::new(10, 10.0).unwrap();
        let (ledger, ids) = ledger(
            &config,
            &[("Winner1", 1), ("Loser1", 3), ("Winner2", 1), ("Loser2", 2)],
        );
        // Spent: W1 10, L1 30, W2 10, L2 20 => 70 chips in play.
        // Profits: W1 +30, L1 -25, W2 +10, L2 -15.
        let result = calculate(
            ledger.players(),
            &config,
            &finals(&ids, &[40, 5, 20, 5]),
        )
        .unwrap();
        assert!(result.is_zero_sum());

        let lines: Vec<String> = result.payments.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "Loser1 pays Winner1 $25.00",
                "Loser2 pays Winner1 $5.00",
                "Loser2 pays Winner2 $10.00",
            ]
        );
    }

    #[test]
    fn test_not_sorted_by_magnitude() {
        let config = GameConfig::new(10, 10.0).unwrap();
        // Small winner first, big winner second.
        let (ledger, ids) = ledger(&config, &[("Small", 1), ("Big", 1), ("Loser", 4)]);
        // 60 chips. Small +5, Big +25, Loser -30.
        let result = calculate(ledger.players(), &config, &finals(&ids, &[15, 35, 10])).unwrap();

        assert_eq!(result.payments.len(), 2);
        assert_eq!(result.payments[0].to, ids[0]);
        assert_abs_diff_eq!(result.payments[0].amount, 5.0, epsilon = 1e-9);
        assert_eq!(result.payments[1].to, ids[1]);
        assert_abs_diff_eq!(result.payments[1].amount, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_transfers_balance_winnings() {
        let config = GameConfig::new(300, 25.0).unwrap();
        let (ledger, ids) = ledger(
            &config,
            &[("A", 3), ("B", 1), ("C", 2), ("D", 4), ("E", 1)],
        );
        // 11 buy-ins, 3300 chips.
        let result = calculate(
            ledger.players(),
            &config,
            &finals(&ids, &[1700, 0, 377, 1000, 223]),
        )
        .unwrap();

        assert!(result.is_zero_sum());
        let winnings: f64 = result.players.iter().map(|p| p.profit.max(0.0)).sum();
        let transferred: f64 = result.payments.iter().map(|p| p.amount).sum();
        assert_abs_diff_eq!(winnings, transferred, epsilon = 0.01 * result.payments.len() as f64 + 1e-9);
    }

    #[test]
    fn test_everyone_even_means_no_payments() {
        let config = GameConfig::default();
        let (ledger, ids) = ledger(&config, &[("Alice", 1), ("Bob", 1)]);
        let result = calculate(ledger.players(), &config, &finals(&ids, &[100, 100])).unwrap();
        assert!(result.payments.is_empty());
        assert!(
            result
                .to_markdown()
                .contains("No settlements needed - all players broke even!")
        );
    }

    #[test]
    fn test_inconsistent_chip_totals_still_compute() {
        let config = GameConfig::new(100, 20.0).unwrap();
        let (ledger, ids) = ledger(&config, &[("Alice", 1), ("Bob", 1)]);
        // 250 chips reported against 200 in play.
        let result = calculate(ledger.players(), &config, &finals(&ids, &[200, 50])).unwrap();

        assert_abs_diff_eq!(result.player(ids[0]).unwrap().profit, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.player(ids[1]).unwrap().profit, -10.0, epsilon = 1e-9);
        assert!(!result.is_zero_sum());
    }

    #[test]
    fn test_sub_cent_transfers_are_dropped() {
        let config = GameConfig::new(1000, 1.0).unwrap();
        let (ledger, ids) = ledger(&config, &[("Alice", 1), ("Bob", 1)]);
        // One chip is a tenth of a cent.
        let result = calculate(ledger.players(), &config, &finals(&ids, &[1005, 995])).unwrap();
        assert!(result.payments.is_empty());

        // Somebody did win and lose, just not enough to pay out.
        let md = result.to_markdown();
        assert!(!md.contains("broke even"));
        assert!(md.ends_with("## Settlement Suggestions\n\n"));
    }

    #[test]
    fn test_oversized_totals_are_an_error() {
        // Built by hand, validate() would reject it.
        let config = GameConfig {
            chips_per_buyin: u64::MAX / 2 + 1,
            ..GameConfig::default()
        };
        let (ledger, ids) = ledger(&config, &[("Alice", 1), ("Bob", 1)]);
        assert_eq!(
            calculate(ledger.players(), &config, &finals(&ids, &[0, 0])),
            Err(SettlementError::Overflow)
        );
    }

    #[test]
    fn test_markdown_report() {
        let config = GameConfig::new(100, 20.0).unwrap();
        let (ledger, ids) = ledger(&config, &[("Alice", 2), ("Bob", 1)]);
        let result = calculate(ledger.players(), &config, &finals(&ids, &[250, 50])).unwrap();
        let md = result.to_markdown();

        assert!(md.contains("- **Total Buy-ins**: 3"));
        assert!(md.contains("- **Total Chips in Play**: 300"));
        assert!(md.contains("- **Total Dollars in Play**: $60.00"));
        assert!(md.contains("- **Value per Chip**: $0.2000"));
        assert!(md.contains("| Alice | 2 | $40.00 | $50.00 | +$10.00 |"));
        assert!(md.contains("| Bob | 1 | $20.00 | $10.00 | -$10.00 |"));
        assert!(md.contains("- Bob pays Alice $10.00"));
    }
}
