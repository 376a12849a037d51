use std::collections::BTreeMap;

use futures_util::future::join_all;
use lattice_core::risk::covenant_tier;
use lattice_core::stats::{at_risk_covenants, unique_loan_ids};
use lattice_core::{Covenant, CovenantStats, CovenantStatus, EntityId, Loan, RiskTier};
use lattice_platform::{ApiResult, CovenantSource};
use serde::Serialize;
use tracing::{info, warn};

/// Covenants with their parent loans joined in.
#[derive(Debug, Clone, Default)]
pub struct CovenantBoard {
    pub covenants: Vec<Covenant>,
    pub loans: BTreeMap<EntityId, Loan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CovenantRow<'a> {
    pub covenant: &'a Covenant,
    pub borrower: Option<&'a str>,
    pub tier: RiskTier,
}

impl CovenantBoard {
    /// A failed covenant listing fails the load. Loans are fetched once
    /// per distinct id, concurrently; a loan that cannot be read only costs
    /// its borrower name.
    pub async fn load<S>(source: &S, status: Option<CovenantStatus>) -> ApiResult<Self>
    where
        S: CovenantSource + ?Sized,
    {
        let covenants = source.covenants(status).await?;
        let loan_ids = unique_loan_ids(&covenants);

        let fetched = join_all(loan_ids.iter().map(|id| source.loan(id))).await;
        let mut loans = BTreeMap::new();
        for (id, result) in loan_ids.into_iter().zip(fetched) {
            match result {
                Ok(loan) => {
                    loans.insert(id, loan);
                }
                Err(err) => warn!(loan_id = %id, "error loading loan: {err}"),
            }
        }

        info!(
            covenants = covenants.len(),
            loans = loans.len(),
            "covenant board loaded"
        );
        Ok(Self { covenants, loans })
    }

    pub fn stats(&self) -> CovenantStats {
        CovenantStats::from_covenants(&self.covenants)
    }

    pub fn rows(&self) -> Vec<CovenantRow<'_>> {
        self.covenants.iter().map(|covenant| self.row(covenant)).collect()
    }

    /// Warning and breach rows, highest 30-day risk first.
    pub fn alerts(&self) -> Vec<CovenantRow<'_>> {
        let mut rows: Vec<_> = at_risk_covenants(&self.covenants)
            .into_iter()
            .map(|covenant| self.row(covenant))
            .collect();
        rows.sort_by(|left, right| right.tier.cmp(&left.tier));
        rows
    }

    fn row<'a>(&'a self, covenant: &'a Covenant) -> CovenantRow<'a> {
        CovenantRow {
            covenant,
            borrower: self
                .loans
                .get(&covenant.loan_id)
                .and_then(|loan| loan.borrower_name.as_deref()),
            tier: covenant_tier(covenant),
        }
    }
}
