//! A CBR application: case base provider, recovery model and aggregator

use crate::aggregate::{Aggregator, Solution};
use crate::recovery::{RankedCase, Recovery};
use cbrx_core::{Case, CaseBase, CaseId, Error, Record, Result};
use serde::Serialize;

/// Solution proposed for a query together with the cases it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub solution: Solution,
    pub neighbours: Vec<RankedCase>,
}

/// Case-based reasoning application
///
/// Mutations go through the case base provider. With `refit_always` set the
/// recovery model is refit after every one of them; otherwise the caller
/// decides when to [`refit`](Cbr::refit).
pub struct Cbr<B: CaseBase> {
    case_base: B,
    recovery: Recovery,
    aggregator: Option<Aggregator>,
    refit_always: bool,
}

impl<B: CaseBase> Cbr<B> {
    /// Build the application and fit the recovery model on the current case base
    pub fn new(
        case_base: B,
        recovery: Recovery,
        aggregator: Option<Aggregator>,
        refit_always: bool,
    ) -> Result<Self> {
        let cbr = Self {
            case_base,
            recovery,
            aggregator,
            refit_always,
        };
        cbr.refit()?;
        Ok(cbr)
    }

    /// Refit the recovery model on a fresh case base snapshot
    pub fn refit(&self) -> Result<()> {
        let table = self.case_base.snapshot()?;
        self.recovery.fit(&table)
    }

    fn after_mutation(&self) -> Result<()> {
        if self.refit_always {
            tracing::debug!("case base changed, refitting");
            self.refit()?;
        }
        Ok(())
    }

    pub fn case_base(&self) -> &B {
        &self.case_base
    }

    pub fn recovery(&self) -> &Recovery {
        &self.recovery
    }

    pub fn aggregator(&self) -> Option<&Aggregator> {
        self.aggregator.as_ref()
    }

    pub fn get_case(&self, id: &CaseId) -> Result<Case> {
        self.case_base.get(id)
    }

    /// Insert a case, or replace the one with the same id
    pub fn add_case(&self, values: Record, id: Option<CaseId>) -> Result<CaseId> {
        let id = self.case_base.add_case(values, id)?;
        tracing::info!(%id, "case added");
        self.after_mutation()?;
        Ok(id)
    }

    pub fn delete_case(&self, id: &CaseId) -> Result<Case> {
        let case = self.case_base.delete_case(id)?;
        tracing::info!(%id, "case deleted");
        self.after_mutation()?;
        Ok(case)
    }

    pub fn retrieve(&self, query: &Record, k: usize) -> Result<Vec<RankedCase>> {
        self.recovery.find_one(query, k)
    }

    pub fn retrieve_batch(&self, queries: &[Record], k: usize) -> Result<Vec<Vec<RankedCase>>> {
        self.recovery.find(queries, k)
    }

    pub fn recommend(&self, query: &Record, k: usize) -> Result<Recommendation> {
        let aggregator = self.aggregator.as_ref().ok_or(Error::NoAggregator)?;
        let neighbours = self.retrieve(query, k)?;
        let solution = aggregator.aggregate(&neighbours)?;
        Ok(Recommendation { solution, neighbours })
    }

    pub fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "case_base": self.case_base.describe(),
            "recovery": self.recovery.describe(),
            "aggregator": self.aggregator,
            "refit_always": self.refit_always,
        })
    }
}
