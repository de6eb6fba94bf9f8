// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::{
    cmp::Ordering,
    ops::{Add, Mul, Sub},
};

use rug::Rational;

/// Exact rational used when a floating-point predicate is too close to call.
#[derive(Clone, Debug)]
pub struct ExactRational(pub Rational);

impl ExactRational {
    /// Exact value of a finite `f64`; non-finite input maps to zero.
    pub fn from_f64(v: f64) -> Self {
        ExactRational(Rational::from_f64(v).unwrap_or_default())
    }

    #[inline]
    pub fn sign(&self) -> Ordering {
        self.0.cmp0()
    }
}

impl<'a, 'b> Add<&'b ExactRational> for &'a ExactRational {
    type Output = ExactRational;

    fn add(self, rhs: &'b ExactRational) -> ExactRational {
        let mut result = self.0.clone();
        result += &rhs.0;
        ExactRational(result)
    }
}

impl<'a, 'b> Sub<&'b ExactRational> for &'a ExactRational {
    type Output = ExactRational;

    fn sub(self, rhs: &'b ExactRational) -> ExactRational {
        let mut result = self.0.clone();
        result -= &rhs.0;
        ExactRational(result)
    }
}

impl<'a, 'b> Mul<&'b ExactRational> for &'a ExactRational {
    type Output = ExactRational;

    fn mul(self, rhs: &'b ExactRational) -> ExactRational {
        let mut result = self.0.clone();
        result *= &rhs.0;
        ExactRational(result)
    }
}

impl PartialEq for ExactRational {
    fn eq(&self, other: &ExactRational) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for ExactRational {
    fn partial_cmp(&self, other: &ExactRational) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_without_rounding() {
        let a = ExactRational::from_f64(0.1);
        let b = ExactRational::from_f64(0.2);
        let c = ExactRational::from_f64(0.3);
        // 0.1 + 0.2 != 0.3 in binary, and the rational keeps that visible
        assert_ne!((&(&a + &b) - &c).sign(), Ordering::Equal);
        assert_eq!((&(&a * &b) - &(&b * &a)).sign(), Ordering::Equal);
    }
}
