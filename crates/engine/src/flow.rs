//! The two multi-step conversations: adding a customer and editing one
//! monthly payment.
//!
//! Both are plain state values; the dispatcher keeps them in a
//! [`SessionStore`](crate::session::SessionStore) and applies transitions
//! under its lock. Nothing here touches the network.

use std::fmt;

use crate::layout::{AddressError, Column, Month, SheetLayout};
use crate::money::{parse_amount_str, AmountError};
use crate::phone_model::format_phone_model;
use crate::record::{Identity, COL_BERDI, COL_SUMMA};

#[derive(Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Required text was blank.
    EmptyInput,
    /// Numeric input did not parse.
    InvalidAmount(AmountError),
    /// A button that belongs to a later step arrived first.
    OutOfOrder,
    /// Year or month outside the sheet layout.
    Address(AddressError),
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "empty input"),
            Self::InvalidAmount(e) => write!(f, "invalid amount: {e}"),
            Self::OutOfOrder => write!(f, "step out of order"),
            Self::Address(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FlowError {}

impl From<AmountError> for FlowError {
    fn from(e: AmountError) -> Self {
        Self::InvalidAmount(e)
    }
}

impl From<AddressError> for FlowError {
    fn from(e: AddressError) -> Self {
        Self::Address(e)
    }
}

/// Validate an amount typed by the operator and return the text to store.
///
/// The sheet keeps what was typed (trimmed); parsing only decides whether it
/// is acceptable.
pub fn accept_amount(text: &str) -> Result<String, FlowError> {
    parse_amount_str(text)?;
    Ok(text.trim().to_string())
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStep {
    AwaitingName,
    AwaitingPhone,
    AwaitingSumma,
    AwaitingNominal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddFlow {
    pub step: AddStep,
    pub name: String,
    pub phone: String,
    pub summa: String,
}

impl Default for AddFlow {
    fn default() -> Self {
        Self {
            step: AddStep::AwaitingName,
            name: String::new(),
            phone: String::new(),
            summa: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// Input accepted; ask for the next field.
    Next(AddStep),
    /// Input rejected; the step is unchanged.
    Rejected(AddStep, FlowError),
    /// All four fields collected.
    Complete(NewRecord),
}

impl AddFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one free-text message into the flow.
    pub fn accept(&mut self, text: &str) -> AddOutcome {
        let step = self.step;
        match self.advance(text) {
            Ok(outcome) => outcome,
            Err(e) => AddOutcome::Rejected(step, e),
        }
    }

    fn advance(&mut self, text: &str) -> Result<AddOutcome, FlowError> {
        let text = text.trim();
        match self.step {
            AddStep::AwaitingName => {
                if text.is_empty() {
                    return Err(FlowError::EmptyInput);
                }
                self.name = text.to_string();
                self.step = AddStep::AwaitingPhone;
            }
            AddStep::AwaitingPhone => {
                let phone = format_phone_model(text);
                if phone.is_empty() {
                    return Err(FlowError::EmptyInput);
                }
                self.phone = phone;
                self.step = AddStep::AwaitingSumma;
            }
            AddStep::AwaitingSumma => {
                self.summa = accept_amount(text)?;
                self.step = AddStep::AwaitingNominal;
            }
            AddStep::AwaitingNominal => {
                let nominal = accept_amount(text)?;
                return Ok(AddOutcome::Complete(NewRecord {
                    name: self.name.clone(),
                    phone: self.phone.clone(),
                    summa: self.summa.clone(),
                    nominal,
                }));
            }
        }
        Ok(AddOutcome::Next(self.step))
    }
}

/// A fully collected customer, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub phone: String,
    pub summa: String,
    pub nominal: String,
}

impl NewRecord {
    pub fn identity(&self) -> Identity {
        Identity::new(&self.name, &self.phone)
    }

    /// The six leading cells for sheet row `row`.
    ///
    /// Berdi sums the monthly span of the same row; Qoldiq is Summa − Berdi.
    pub fn to_row(&self, row: u32, layout: &SheetLayout, sum_function: &str) -> Vec<String> {
        let (first, last) = layout.payment_span();
        let summa = Column(COL_SUMMA as u32 + 1).letters();
        let berdi = Column(COL_BERDI as u32 + 1).letters();
        vec![
            self.name.clone(),
            self.phone.clone(),
            self.summa.clone(),
            format!(
                "={}({}{}:{}{})",
                sum_function,
                first.letters(),
                row,
                last.letters(),
                row
            ),
            format!("={summa}{row}-{berdi}{row}"),
            self.nominal.clone(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditFlow {
    IdentityChosen { identity: Identity },
    YearChosen { identity: Identity, year: i32 },
    MonthChosen { identity: Identity, year: i32, month: Month },
}

impl EditFlow {
    pub fn start(identity: Identity) -> Self {
        Self::IdentityChosen { identity }
    }

    pub fn identity(&self) -> &Identity {
        match self {
            Self::IdentityChosen { identity }
            | Self::YearChosen { identity, .. }
            | Self::MonthChosen { identity, .. } => identity,
        }
    }

    /// Pick (or re-pick) the year. Clears any chosen month.
    pub fn choose_year(&mut self, year: &str, layout: &SheetLayout) -> Result<i32, FlowError> {
        let year: i32 = year
            .trim()
            .parse()
            .map_err(|_| AddressError::UnknownYear(year.to_string()))?;
        if !layout.years().any(|y| y == year) {
            return Err(AddressError::UnknownYear(year.to_string()).into());
        }
        *self = Self::YearChosen { identity: self.identity().clone(), year };
        Ok(year)
    }

    /// Pick the month. Requires a chosen year.
    pub fn choose_month(&mut self, month: &str) -> Result<Month, FlowError> {
        let month: Month = month.trim().parse()?;
        let year = match self {
            Self::YearChosen { year, .. } | Self::MonthChosen { year, .. } => *year,
            Self::IdentityChosen { .. } => return Err(FlowError::OutOfOrder),
        };
        *self = Self::MonthChosen { identity: self.identity().clone(), year, month };
        Ok(month)
    }

    /// Whether free text is expected now.
    pub fn awaiting_amount(&self) -> bool {
        matches!(self, Self::MonthChosen { .. })
    }
}
