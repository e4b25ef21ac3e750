use crate::{Case, CaseId, Error, Record, Result, Value};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only snapshot of a case base, in case base order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaseTable {
    cases: Vec<Case>,
}

impl CaseTable {
    pub fn new(cases: Vec<Case>) -> Self {
        Self { cases }
    }

    /// Table with integer ids assigned by position
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let cases = records
            .into_iter()
            .enumerate()
            .map(|(i, values)| Case::new(i as u64, values))
            .collect();
        Self { cases }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    #[inline]
    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn iter(&self) -> impl Iterator<Item = &Case> {
        self.cases.iter()
    }

    /// Values of one column, in row order
    pub fn column<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.cases.iter().map(move |c| c.get(attribute))
    }

    pub fn get(&self, id: &CaseId) -> Option<&Case> {
        self.cases.iter().find(|c| &c.id == id)
    }

    pub fn into_cases(self) -> Vec<Case> {
        self.cases
    }
}

impl FromIterator<Case> for CaseTable {
    fn from_iter<I: IntoIterator<Item = Case>>(iter: I) -> Self {
        Self { cases: iter.into_iter().collect() }
    }
}

/// Source of cases for fitting a retrieval model
///
/// Implementations own persistence. Mutations are reported back to the
/// caller so that it can refit; nothing here updates fitted state.
pub trait CaseBase: Send + Sync {
    /// Snapshot of every case, in stable case base order
    fn snapshot(&self) -> Result<CaseTable>;

    fn get(&self, id: &CaseId) -> Result<Case>;

    /// Insert a case, or replace the case with the same id
    fn add_case(&self, values: Record, id: Option<CaseId>) -> Result<CaseId>;

    fn delete_case(&self, id: &CaseId) -> Result<Case>;

    /// Structured description of the provider for diagnostics
    fn describe(&self) -> serde_json::Value;
}

/// Case base held in memory, with integer ids for cases added without one
///
/// Generated ids stay below `u64::MAX`; once an integer id of `u64::MAX` is
/// present no further ids are generated.
pub struct MemoryCaseBase {
    cases: RwLock<Vec<Case>>,
    next_id: AtomicU64,
}

impl MemoryCaseBase {
    pub fn new() -> Self {
        Self {
            cases: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn from_cases(cases: Vec<Case>) -> Self {
        let next = cases
            .iter()
            .filter_map(|c| match c.id {
                CaseId::Integer(i) => Some(i.saturating_add(1)),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        Self {
            cases: RwLock::new(cases),
            next_id: AtomicU64::new(next),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self::from_cases(CaseTable::from_records(records).into_cases())
    }

    pub fn count(&self) -> usize {
        self.cases.read().len()
    }
}

impl Default for MemoryCaseBase {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseBase for MemoryCaseBase {
    fn snapshot(&self) -> Result<CaseTable> {
        Ok(CaseTable::new(self.cases.read().clone()))
    }

    fn get(&self, id: &CaseId) -> Result<Case> {
        self.cases
            .read()
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| Error::CaseNotFound(id.to_string()))
    }

    fn add_case(&self, values: Record, id: Option<CaseId>) -> Result<CaseId> {
        let mut cases = self.cases.write();
        let id = match id {
            Some(id) => {
                if let CaseId::Integer(i) = id {
                    self.next_id.fetch_max(i.saturating_add(1), Ordering::AcqRel);
                }
                id
            }
            None => self
                .next_id
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n < u64::MAX).then(|| n + 1)
                })
                .map(CaseId::Integer)
                .map_err(|_| Error::Storage("integer case ids exhausted".to_string()))?,
        };

        match cases.iter_mut().find(|c| c.id == id) {
            Some(existing) => existing.values = values,
            None => cases.push(Case::new(id.clone(), values)),
        }
        Ok(id)
    }

    fn delete_case(&self, id: &CaseId) -> Result<Case> {
        let mut cases = self.cases.write();
        let pos = cases
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| Error::CaseNotFound(id.to_string()))?;
        Ok(cases.remove(pos))
    }

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "memory",
            "cases": self.count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn test_table_column() {
        let table = CaseTable::from_records(vec![
            record([("x", Value::Number(1.0))]),
            record([("y", Value::Number(2.0))]),
        ]);
        let column: Vec<&Value> = table.column("x").collect();
        assert_eq!(column, vec![&Value::Number(1.0), &Value::Null]);
        assert_eq!(table.cases()[1].id, CaseId::Integer(1));
    }

    #[test]
    fn test_memory_case_base_add_replace_delete() {
        let base = MemoryCaseBase::from_records(vec![record([("x", 1.0)]), record([("x", 2.0)])]);
        assert_eq!(base.count(), 2);

        let id = base.add_case(record([("x", 3.0)]), None).unwrap();
        assert_eq!(id, CaseId::Integer(2));

        base.add_case(record([("x", 10.0)]), Some(CaseId::Integer(0))).unwrap();
        assert_eq!(base.count(), 3);
        assert_eq!(base.get(&CaseId::Integer(0)).unwrap().get("x"), &Value::Number(10.0));

        let removed = base.delete_case(&CaseId::Integer(1)).unwrap();
        assert_eq!(removed.get("x"), &Value::Number(2.0));
        assert!(matches!(
            base.delete_case(&CaseId::Integer(1)),
            Err(Error::CaseNotFound(_))
        ));

        let order: Vec<CaseId> = base.snapshot().unwrap().iter().map(|c| c.id.clone()).collect();
        assert_eq!(order, vec![CaseId::Integer(0), CaseId::Integer(2)]);
    }

    #[test]
    fn test_largest_integer_id_stops_id_generation() {
        let base = MemoryCaseBase::from_cases(vec![Case::new(CaseId::Integer(u64::MAX), record([("x", 1.0)]))]);
        assert!(matches!(
            base.add_case(record([("x", 2.0)]), None),
            Err(Error::Storage(_))
        ));
        assert_eq!(base.count(), 1);

        let base = MemoryCaseBase::new();
        base.add_case(record([("x", 1.0)]), Some(CaseId::Integer(u64::MAX))).unwrap();
        let err = base.add_case(record([("x", 2.0)]), None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Storage);

        let base = MemoryCaseBase::new();
        base.add_case(record([("x", 1.0)]), Some(CaseId::Integer(u64::MAX - 2))).unwrap();
        assert_eq!(
            base.add_case(record([("x", 2.0)]), None).unwrap(),
            CaseId::Integer(u64::MAX - 1)
        );
        assert!(base.add_case(record([("x", 3.0)]), None).is_err());
        assert_eq!(base.count(), 2);
    }

    #[test]
    fn test_explicit_id_advances_counter() {
        let base = MemoryCaseBase::new();
        base.add_case(record([("x", 1.0)]), Some(CaseId::Integer(5))).unwrap();
        let next = base.add_case(record([("x", 2.0)]), None).unwrap();
        assert_eq!(next, CaseId::Integer(6));
    }
}
