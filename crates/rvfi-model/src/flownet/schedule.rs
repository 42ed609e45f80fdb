//! Scale schedules for the coarse-to-fine cascade.

use crate::error::{ModelError, Result};

/// Ordered per-stage downsampling factors, coarsest first.
///
/// The cascade runs one refinement stage per entry, each operating at
/// `1/factor` of the input resolution. Factors are strictly decreasing and
/// the final stage always runs at full resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleSchedule(Vec<usize>);

impl Default for ScaleSchedule {
    fn default() -> Self {
        Self(vec![8, 4, 2, 1])
    }
}

impl ScaleSchedule {
    /// Build a schedule, validating its invariants.
    pub fn new(factors: Vec<usize>) -> Result<Self> {
        if factors.is_empty() {
            return Err(ModelError::invalid_schedule("schedule is empty"));
        }
        if *factors.last().expect("non-empty") != 1 {
            return Err(ModelError::invalid_schedule(format!(
                "last stage must run at full resolution, got factor {}",
                factors.last().expect("non-empty")
            )));
        }
        if !factors.windows(2).all(|pair| pair[0] > pair[1]) {
            return Err(ModelError::invalid_schedule(format!(
                "factors must be strictly decreasing, got {factors:?}"
            )));
        }
        Ok(Self(factors))
    }

    pub fn factors(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The coarsest factor; inputs must be divisible accordingly.
    pub fn coarsest(&self) -> usize {
        self.0[0]
    }

    /// Check the schedule against a cascade's stage count.
    pub fn check_stages(&self, stages: usize) -> Result<()> {
        if self.len() != stages {
            return Err(ModelError::invalid_schedule(format!(
                "schedule has {} entries but the cascade has {stages} stages",
                self.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let schedule = ScaleSchedule::default();
        assert_eq!(schedule.factors(), &[8, 4, 2, 1]);
        assert_eq!(schedule.coarsest(), 8);
    }

    #[test]
    fn test_rejects_empty() {
        assert!(ScaleSchedule::new(vec![]).is_err());
    }

    #[test]
    fn test_rejects_terminal_not_one() {
        assert!(ScaleSchedule::new(vec![8, 4, 2]).is_err());
    }

    #[test]
    fn test_rejects_non_decreasing() {
        assert!(ScaleSchedule::new(vec![4, 4, 1]).is_err());
        assert!(ScaleSchedule::new(vec![2, 4, 1]).is_err());
    }

    #[test]
    fn test_accepts_valid() {
        assert!(ScaleSchedule::new(vec![1]).is_ok());
        assert!(ScaleSchedule::new(vec![4, 2, 1]).is_ok());
    }

    #[test]
    fn test_check_stages() {
        let schedule = ScaleSchedule::new(vec![2, 1]).unwrap();
        assert!(schedule.check_stages(2).is_ok());
        assert!(schedule.check_stages(4).is_err());
    }
}
