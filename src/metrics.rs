//! Statistical measures of association rules.
//!
//! Every measure here is a pure function of four counts: how many transactions
//! contain the left hand side, the right hand side, both of them, and how many
//! transactions were observed in total. The secondary measures are computed
//! from the 2×2 contingency table
//!
//! ```text
//!               rhs      ¬rhs
//!     lhs        a         b
//!    ¬lhs        c         d
//! ```
//!
//! where `a = pair`, `b = lhs − pair`, `c = rhs − pair` and
//! `d = transactions − a − b − c`.

/// Fraction of transactions containing an item (or a pair of items).
pub fn support(count: usize, transaction_count: usize) -> f64 {
    count as f64 / transaction_count as f64
}

/// Empirical probability of the right hand side given the left hand side.
pub fn confidence(pair_support: f64, lhs_support: f64) -> f64 {
    pair_support / lhs_support
}

pub fn lift(confidence: f64, rhs_support: f64) -> f64 {
    confidence / rhs_support
}

/// Infinite when the rule always holds (confidence of one).
pub fn conviction(rhs_support: f64, confidence: f64) -> f64 {
    (1.0 - rhs_support) / (1.0 - confidence)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContingencyTable {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl ContingencyTable {
    pub fn new(lhs_count: usize, rhs_count: usize, pair_count: usize, transaction_count: usize) -> Self {
        let a = pair_count as f64;
        let b = lhs_count as f64 - a;
        let c = rhs_count as f64 - a;
        let d = transaction_count as f64 - a - b - c;
        Self { a, b, c, d }
    }

    fn cross_difference(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    fn marginal_product(&self) -> f64 {
        (self.a + self.b) * (self.a + self.c) * (self.b + self.d) * (self.c + self.d)
    }

    pub fn yule_q(&self) -> f64 {
        self.cross_difference() / (self.a * self.d + self.b * self.c)
    }

    pub fn phi(&self) -> f64 {
        self.cross_difference() / self.marginal_product().sqrt()
    }

    pub fn chi_squared(&self) -> f64 {
        let n = self.a + self.b + self.c + self.d;
        n * self.cross_difference().powi(2) / self.marginal_product()
    }
}
