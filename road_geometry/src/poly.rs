use serde::{Deserialize, Serialize};

/// f(p) = a + b * p + c * p^2 + d * p^3
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cubic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Cubic {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    /// horner form
    pub fn evaluate(&self, p: f64) -> f64 {
        self.a + p * (self.b + p * (self.c + p * self.d))
    }

    /// f'(p) = b + 2c * p + 3d * p^2, which is a quadratic so d is always zero
    pub fn derivative(&self) -> Self {
        Self::new(self.b, 2.0 * self.c, 3.0 * self.d, 0.0)
    }

    pub fn evaluate_derivative(&self, p: f64) -> f64 {
        self.derivative().evaluate(p)
    }
}

/// A cubic that takes over at `s_offset` and stays valid until the next one starts
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetCubic {
    pub cubic: Cubic,
    pub s_offset: f64,
}

impl OffsetCubic {
    /// the implicit entry used where nothing is declared
    pub const ZERO: Self = Self {
        cubic: Cubic::ZERO,
        s_offset: 0.0,
    };

    pub const fn new(s_offset: f64, a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            cubic: Cubic::new(a, b, c, d),
            s_offset,
        }
    }

    /// evaluate at an absolute coordinate, the local parameter is s - s_offset
    pub fn evaluate(&self, s: f64) -> f64 {
        self.cubic.evaluate(s - self.s_offset)
    }

    pub fn evaluate_derivative(&self, s: f64) -> f64 {
        self.cubic.evaluate_derivative(s - self.s_offset)
    }

    /// Expand around s = 0, so two entries with different offsets can be compared
    pub fn to_global(&self) -> Cubic {
        let o = self.s_offset;
        let Cubic { a, b, c, d } = self.cubic;
        Cubic {
            a: a - b * o + c * o * o - d * o * o * o,
            b: b - 2.0 * c * o + 3.0 * d * o * o,
            c: c - 3.0 * d * o,
            d,
        }
    }
}

/// Index of the entry active at `s`: the last one with offset <= s
///
/// None if `s` comes before the first offset (or there are no offsets)
pub fn last_at_or_before<T>(items: &[T], s: f64, offset: impl Fn(&T) -> f64) -> Option<usize> {
    // entries are sorted ascending, equal offsets resolve to the later one
    let count = items.partition_point(|item| offset(item) <= s);
    count.checked_sub(1)
}

/// The active cubic at `s`, falling back to the implicit zero cubic before the first
/// entry or for an empty list
pub fn active_offset_cubic(cubics: &[OffsetCubic], s: f64) -> OffsetCubic {
    last_at_or_before(cubics, s, |c| c.s_offset)
        .map(|i| cubics[i])
        .unwrap_or(OffsetCubic::ZERO)
}

/// true if both describe the same function of s once each offset has been applied
pub fn same_equation(first: &OffsetCubic, second: &OffsetCubic, epsilon: f64) -> bool {
    let f = first.to_global();
    let g = second.to_global();
    [f.a - g.a, f.b - g.b, f.c - g.c, f.d - g.d]
        .iter()
        .all(|diff| diff.abs() < epsilon)
}
