//! Basket commands.

use catalog_store::{LineItemId, StockEntryId, UserId};

use crate::error::ReservationError;

/// One requested reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLine {
    pub stock_entry_id: StockEntryId,
    pub quantity: u32,
}

/// Command to reserve stock into the user's basket.
#[derive(Debug, Clone)]
pub struct AddItems {
    pub user_id: UserId,
    pub lines: Vec<AddLine>,
}

impl AddItems {
    /// Creates a new AddItems command.
    pub fn new(user_id: UserId, lines: Vec<AddLine>) -> Self {
        Self { user_id, lines }
    }

    /// Checks the command shape, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ReservationError>> {
        if self.lines.is_empty() {
            return Err(vec![ReservationError::InvalidInput(
                "no items given".to_string(),
            )]);
        }
        let errors: Vec<_> = self
            .lines
            .iter()
            .filter(|line| line.quantity == 0)
            .map(|line| {
                ReservationError::InvalidInput(format!(
                    "quantity for stock entry {} must be greater than 0",
                    line.stock_entry_id
                ))
            })
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Requested quantity per stock entry, in order of first appearance.
    pub fn requested_totals(&self) -> Vec<(StockEntryId, u32)> {
        let mut totals: Vec<(StockEntryId, u32)> = Vec::new();
        for line in &self.lines {
            match totals.iter_mut().find(|(id, _)| *id == line.stock_entry_id) {
                Some((_, total)) => *total = total.saturating_add(line.quantity),
                None => totals.push((line.stock_entry_id, line.quantity)),
            }
        }
        totals
    }
}

/// One requested quantity change. Zero releases the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateLine {
    pub line_item_id: LineItemId,
    pub quantity: u32,
}

/// Command to change reserved quantities in the user's basket.
#[derive(Debug, Clone)]
pub struct UpdateItems {
    pub user_id: UserId,
    pub lines: Vec<UpdateLine>,
}

impl UpdateItems {
    /// Creates a new UpdateItems command.
    pub fn new(user_id: UserId, lines: Vec<UpdateLine>) -> Self {
        Self { user_id, lines }
    }

    pub fn validate(&self) -> Result<(), Vec<ReservationError>> {
        if self.lines.is_empty() {
            return Err(vec![ReservationError::InvalidInput(
                "no items given".to_string(),
            )]);
        }
        Ok(())
    }
}

/// Command to release and delete lines from the user's basket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveItems {
    pub user_id: UserId,
    pub line_item_ids: Vec<LineItemId>,
}

impl RemoveItems {
    /// Parses a comma-separated id list such as `"1,2,3"`.
    ///
    /// Tokens that are not non-negative integers are skipped. Duplicates
    /// collapse into one id.
    pub fn parse(user_id: UserId, raw: &str) -> Result<Self, ReservationError> {
        let mut line_item_ids = Vec::new();
        for token in raw.split(',').map(str::trim) {
            if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let Ok(id) = token.parse::<i64>() else {
                continue;
            };
            let id = LineItemId::new(id);
            if !line_item_ids.contains(&id) {
                line_item_ids.push(id);
            }
        }

        if line_item_ids.is_empty() {
            return Err(ReservationError::InvalidInput(
                "no valid line item ids given".to_string(),
            ));
        }
        Ok(Self {
            user_id,
            line_item_ids,
        })
    }
}
