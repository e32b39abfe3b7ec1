use std::fmt;

use approx::abs_diff_eq;
use serde::{Deserialize, Serialize};

use crate::core::{Cents, PlayerId, format_dollars, format_signed_dollars};
use crate::ledger::Player;

/// How one player finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player_id: PlayerId,
    pub name: String,
    pub buyins: u32,
    pub total_spent: Cents,
    pub final_chips: u64,
    /// `final_chips * chip_value`, unrounded
    pub final_value: f64,
    /// `final_value - total_spent`, unrounded
    pub profit: f64,
}

/// A suggested transfer from a losing player to a winning one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub from: PlayerId,
    pub from_name: String,
    pub to: PlayerId,
    pub to_name: String,
    pub amount: f64,
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pays {} {}",
            self.from_name,
            self.to_name,
            format_dollars(self.amount)
        )
    }
}

/// Everything the settlement calculator derives from a ledger snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub total_buyins: u64,
    pub total_chips_in_play: u64,
    pub total_dollars_in_play: Cents,
    /// Dollars per chip. Never rounded; use [`format_dollars`] for display.
    pub chip_value: f64,
    /// In ledger order
    pub players: Vec<PlayerResult>,
    /// In the order the greedy pass produced them
    pub payments: Vec<Payment>,
}

impl SettlementResult {
    /// The report for a table with no chips in play: every chip is worth
    /// nothing and nobody owes anybody.
    pub fn vacuous(players: &[Player]) -> Self {
        Self {
            total_buyins: 0,
            total_chips_in_play: 0,
            total_dollars_in_play: Cents::ZERO,
            chip_value: 0.0,
            players: players
                .iter()
                .map(|p| PlayerResult {
                    player_id: p.id,
                    name: p.name.clone(),
                    buyins: p.buyin_count,
                    total_spent: p.total_spent,
                    final_chips: p.current_chips,
                    final_value: 0.0,
                    profit: -p.total_spent.as_dollars(),
                })
                .collect(),
            payments: vec![],
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerResult> {
        self.players.iter().find(|p| p.player_id == id)
    }

    pub fn total_profit(&self) -> f64 {
        self.players.iter().map(|p| p.profit).sum()
    }

    pub fn total_final_chips(&self) -> u64 {
        self.players.iter().map(|p| p.final_chips).sum()
    }

    /// True when profits cancel out, within `1e-6` of the dollars in play.
    ///
    /// Only expected when the final chip counts add up to the chips in play.
    pub fn is_zero_sum(&self) -> bool {
        let epsilon = (self.total_dollars_in_play.as_dollars() * 1e-6).max(f64::EPSILON);
        abs_diff_eq!(self.total_profit(), 0.0, epsilon = epsilon)
    }

    /// Format the settlement the way it's shown at the table.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Settlement Summary\n\n");
        output.push_str(&format!("- **Total Buy-ins**: {}\n", self.total_buyins));
        output.push_str(&format!(
            "- **Total Chips in Play**: {}\n",
            self.total_chips_in_play
        ));
        output.push_str(&format!(
            "- **Total Dollars in Play**: {}\n",
            self.total_dollars_in_play
        ));
        output.push_str(&format!("- **Value per Chip**: ${:.4}\n", self.chip_value));
        output.push('\n');

        output.push_str("## Players\n\n");
        output.push_str("| Player | Buy-ins | Spent | Final | Profit |\n");
        output.push_str("|--------|---------|-------|-------|--------|\n");
        for p in &self.players {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                p.name,
                p.buyins,
                p.total_spent,
                format_dollars(p.final_value),
                format_signed_dollars(p.profit)
            ));
        }
        output.push('\n');

        output.push_str("## Settlement Suggestions\n\n");
        let has_winner = self.players.iter().any(|p| p.profit > 0.0);
        let has_loser = self.players.iter().any(|p| p.profit < 0.0);
        if has_winner && has_loser {
            // Transfers at or below a cent were dropped, so this can be empty
            for payment in &self.payments {
                output.push_str(&format!("- {}\n", payment));
            }
        } else {
            output.push_str("No settlements needed - all players broke even!\n");
        }

        output
    }
}
