//! Storage seams and in-memory implementations
//!
//! [`StatsSource`] is the read side the series builder consumes.
//! [`PredictionStore`] persists a prediction together with its
//! observations and forecast points; `save` replaces the whole record in
//! one step so a recompute is never half-written.

use crate::model::{
    College, CollegeId, MonthExpense, OwnerId, PredictionId, PredictionRecord, YearStat,
};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Failures raised by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Storage error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read access to stored college data
pub trait StatsSource: Send + Sync {
    fn college(&self, id: CollegeId) -> StoreResult<Option<College>>;

    /// Year rows for one college, or for all colleges when `None`
    fn year_stats(&self, college: Option<CollegeId>) -> StoreResult<Vec<YearStat>>;

    /// Expense rows for one college, or for all colleges when `None`
    fn month_expenses(&self, college: Option<CollegeId>) -> StoreResult<Vec<MonthExpense>>;
}

/// Persistence for prediction records, always filtered by owner
pub trait PredictionStore: Send + Sync {
    fn allocate_id(&self) -> StoreResult<PredictionId>;

    fn find(&self, owner: OwnerId, id: PredictionId) -> StoreResult<Option<PredictionRecord>>;

    fn list(&self, owner: OwnerId) -> StoreResult<Vec<PredictionRecord>>;

    /// Insert or fully replace a record
    fn save(&self, record: PredictionRecord) -> StoreResult<()>;

    /// Remove a record and its children; `false` when nothing matched
    fn delete(&self, owner: OwnerId, id: PredictionId) -> StoreResult<bool>;
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::Poisoned)
}

#[derive(Debug, Default)]
struct StatsTables {
    colleges: BTreeMap<CollegeId, College>,
    year_stats: BTreeMap<(CollegeId, i32), YearStat>,
    month_expenses: Vec<MonthExpense>,
}

/// College data held in memory
#[derive(Debug, Default)]
pub struct InMemoryStats {
    tables: RwLock<StatsTables>,
}

impl InMemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_college(&self, college: College) -> StoreResult<()> {
        write(&self.tables)?.colleges.insert(college.id, college);
        Ok(())
    }

    /// Rows are unique per (college, year); a second write replaces the first
    pub fn upsert_year_stat(&self, stat: YearStat) -> StoreResult<()> {
        write(&self.tables)?
            .year_stats
            .insert((stat.college_id, stat.year), stat);
        Ok(())
    }

    pub fn add_month_expense(&self, expense: MonthExpense) -> StoreResult<()> {
        write(&self.tables)?.month_expenses.push(expense);
        Ok(())
    }

    /// Drop a college and every row that belongs to it
    pub fn remove_college(&self, id: CollegeId) -> StoreResult<bool> {
        let mut tables = write(&self.tables)?;
        let removed = tables.colleges.remove(&id).is_some();
        tables.year_stats.retain(|(college_id, _), _| *college_id != id);
        tables.month_expenses.retain(|row| row.college_id != id);
        Ok(removed)
    }
}

impl StatsSource for InMemoryStats {
    fn college(&self, id: CollegeId) -> StoreResult<Option<College>> {
        Ok(read(&self.tables)?.colleges.get(&id).cloned())
    }

    fn year_stats(&self, college: Option<CollegeId>) -> StoreResult<Vec<YearStat>> {
        Ok(read(&self.tables)?
            .year_stats
            .values()
            .filter(|row| college.map_or(true, |id| row.college_id == id))
            .cloned()
            .collect())
    }

    fn month_expenses(&self, college: Option<CollegeId>) -> StoreResult<Vec<MonthExpense>> {
        Ok(read(&self.tables)?
            .month_expenses
            .iter()
            .filter(|row| college.map_or(true, |id| row.college_id == id))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct PredictionTables {
    last_id: PredictionId,
    records: BTreeMap<PredictionId, PredictionRecord>,
}

/// Prediction records held in memory
#[derive(Debug, Default)]
pub struct InMemoryPredictionStore {
    tables: RwLock<PredictionTables>,
}

impl InMemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all owners
    pub fn len(&self) -> StoreResult<usize> {
        Ok(read(&self.tables)?.records.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl PredictionStore for InMemoryPredictionStore {
    fn allocate_id(&self) -> StoreResult<PredictionId> {
        let mut tables = write(&self.tables)?;
        tables.last_id += 1;
        Ok(tables.last_id)
    }

    fn find(&self, owner: OwnerId, id: PredictionId) -> StoreResult<Option<PredictionRecord>> {
        Ok(read(&self.tables)?
            .records
            .get(&id)
            .filter(|record| record.prediction.owner_id == owner)
            .cloned())
    }

    fn list(&self, owner: OwnerId) -> StoreResult<Vec<PredictionRecord>> {
        Ok(read(&self.tables)?
            .records
            .values()
            .filter(|record| record.prediction.owner_id == owner)
            .cloned()
            .collect())
    }

    fn save(&self, record: PredictionRecord) -> StoreResult<()> {
        write(&self.tables)?
            .records
            .insert(record.prediction.id, record);
        Ok(())
    }

    fn delete(&self, owner: OwnerId, id: PredictionId) -> StoreResult<bool> {
        let mut tables = write(&self.tables)?;
        let owned = tables
            .records
            .get(&id)
            .is_some_and(|record| record.prediction.owner_id == owner);
        if owned {
            tables.records.remove(&id);
        }
        Ok(owned)
    }
}
