// ==========================================
// 车队排班系统 - 评分值对象
// ==========================================
// 红线: 所有评分必须落在 [0, 1]，构造时校验，其他位置不得静默截断
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 评分校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("评分超出范围 [0, 1]: {0}")]
    OutOfRange(f64),

    #[error("评分不是有限数: {0}")]
    NotFinite(f64),
}

// ==========================================
// UnitScore - [0, 1] 区间评分
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct UnitScore(f64);

impl UnitScore {
    pub const ZERO: UnitScore = UnitScore(0.0);
    pub const ONE: UnitScore = UnitScore(1.0);

    /// 校验并构造评分
    ///
    /// # 错误
    /// - NaN / ±∞ → ScoreError::NotFinite
    /// - 超出 [0, 1] → ScoreError::OutOfRange
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite(value));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ScoreError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// 取值
    pub fn value(self) -> f64 {
        self.0
    }

    /// 加权组合评分
    ///
    /// 权重之和不得超过 1；浮点累加误差（≤ 1e-9）归并到 1.0。
    pub fn weighted(parts: &[(f64, UnitScore)]) -> Result<Self, ScoreError> {
        let total: f64 = parts.iter().map(|(w, s)| w * s.0).sum();
        if total > 1.0 && total - 1.0 <= WEIGHT_EPSILON {
            return Ok(Self::ONE);
        }
        Self::new(total)
    }
}

const WEIGHT_EPSILON: f64 = 1e-9;

impl TryFrom<f64> for UnitScore {
    type Error = ScoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        UnitScore::new(value)
    }
}

impl From<UnitScore> for f64 {
    fn from(score: UnitScore) -> Self {
        score.0
    }
}

impl fmt::Display for UnitScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_bounds() {
        assert_eq!(UnitScore::new(0.0).unwrap(), UnitScore::ZERO);
        assert_eq!(UnitScore::new(1.0).unwrap(), UnitScore::ONE);
        assert_eq!(UnitScore::new(0.42).unwrap().value(), 0.42);
    }

    #[test]
    fn test_rejects_out_of_range_and_nan() {
        assert_eq!(UnitScore::new(1.0001), Err(ScoreError::OutOfRange(1.0001)));
        assert_eq!(UnitScore::new(-0.1), Err(ScoreError::OutOfRange(-0.1)));
        assert!(matches!(UnitScore::new(f64::NAN), Err(ScoreError::NotFinite(_))));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: UnitScore = serde_json::from_str("0.5").unwrap();
        assert_eq!(ok.value(), 0.5);
        assert!(serde_json::from_str::<UnitScore>("1.5").is_err());
    }

    #[test]
    fn test_weighted_absorbs_rounding() {
        let one = UnitScore::ONE;
        let score = UnitScore::weighted(&[(0.3, one), (0.3, one), (0.4, one)]).unwrap();
        assert!((score.value() - 1.0).abs() < 1e-12);

        let nudged = UnitScore::weighted(&[(1.0 + 1e-12, one)]).unwrap();
        assert_eq!(nudged, UnitScore::ONE);

        let half = UnitScore::new(0.5).unwrap();
        let score = UnitScore::weighted(&[(0.5, half), (0.5, UnitScore::ZERO)]).unwrap();
        assert!((score.value() - 0.25).abs() < 1e-12);

        assert!(UnitScore::weighted(&[(2.0, one)]).is_err());
    }
}
