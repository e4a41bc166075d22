//! Region arrangement of a piecewise linear function.
use std::fmt;

use thiserror::Error;

/// Errors while evaluating a [`PwlModel`].
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("No region contains the point {:?}", point)]
    NoRegionMatched { point: Vec<f64> },
    #[error("Point has {} coordinates but the model has dimension {}", found, dimension)]
    DimensionMismatch { found: usize, dimension: usize },
}

/// An unreduced fraction as stored in a PWL file.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Fraction {
    pub numer: i64,
    pub denom: i64,
}

impl Fraction {
    pub fn new(numer: i64, denom: i64) -> Fraction {
        debug_assert!(denom > 0);
        Fraction { numer, denom }
    }

    /// Divides by the stored denominator.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.numer as f64 / self.denom as f64
    }
}

impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.numer, self.denom)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A hyperplane `c0 + c1 * x1 + ... + cD * xD` shared by the constraints of several regions.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryPrototype {
    coefficients: Vec<f64>,
}

impl BoundaryPrototype {
    /// Creates a prototype from the constant term followed by one coefficient per dimension.
    pub fn new(coefficients: Vec<f64>) -> BoundaryPrototype {
        debug_assert!(!coefficients.is_empty());
        BoundaryPrototype { coefficients }
    }

    /// Constant term followed by the per dimension coefficients.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn dimension(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Value of the affine form at `point`.
    pub fn value(&self, point: &[f64]) -> f64 {
        let mut phi = self.coefficients[0];
        for (&x, &c) in point.iter().zip(self.coefficients[1..].iter()) {
            phi += x * c;
        }
        phi
    }
}

/// Side of a boundary hyperplane a region lies on.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Direction {
    /// `g` lines, the affine form is non-negative.
    GreaterEq,
    /// `l` lines, the affine form is non-positive.
    LessEq,
}

impl Direction {
    /// The PWL line prefix for this direction.
    pub fn tag(self) -> char {
        match self {
            Direction::GreaterEq => 'g',
            Direction::LessEq => 'l',
        }
    }

    #[inline]
    fn holds(self, phi: f64) -> bool {
        match self {
            Direction::GreaterEq => phi >= 0.0,
            Direction::LessEq => phi <= 0.0,
        }
    }
}

/// A closed half-space, referring to a prototype by its 0-based index.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct BoundaryConstraint {
    pub prototype: usize,
    pub direction: Direction,
}

/// A convex region together with the affine formula valid inside it.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    formula: Vec<Fraction>,
    constraints: Vec<BoundaryConstraint>,
}

impl Region {
    /// Creates a region from the constant term and coefficients and its boundary constraints.
    pub fn new(formula: Vec<Fraction>, constraints: Vec<BoundaryConstraint>) -> Region {
        debug_assert!(!formula.is_empty());
        Region {
            formula,
            constraints,
        }
    }

    /// Constant term followed by one coefficient per dimension.
    pub fn formula(&self) -> &[Fraction] {
        &self.formula
    }

    pub fn constraints(&self) -> &[BoundaryConstraint] {
        &self.constraints
    }

    /// Value of the region's affine formula at `point`.
    pub fn value(&self, point: &[f64]) -> f64 {
        let mut value = self.formula[0].to_f64();
        for (&x, coefficient) in point.iter().zip(self.formula[1..].iter()) {
            value += coefficient.to_f64() * x;
        }
        value
    }
}

/// A piecewise linear function given as an ordered list of regions.
///
/// Regions are tried in order and the first region containing a point decides its value. Points
/// on a boundary shared by several regions therefore always resolve to the earliest of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PwlModel {
    dimension: usize,
    prototypes: Vec<BoundaryPrototype>,
    regions: Vec<Region>,
}

impl PwlModel {
    /// Creates an empty model of the given input dimension.
    pub fn new(dimension: usize) -> PwlModel {
        PwlModel {
            dimension,
            ..PwlModel::default()
        }
    }

    /// Number of inputs of the function.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn prototypes(&self) -> &[BoundaryPrototype] {
        &self.prototypes
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Appends a prototype and returns its 0-based index.
    pub fn add_prototype(&mut self, prototype: BoundaryPrototype) -> usize {
        debug_assert_eq!(prototype.dimension(), self.dimension);
        self.prototypes.push(prototype);
        self.prototypes.len() - 1
    }

    /// Appends a region after all existing regions.
    pub fn add_region(&mut self, region: Region) {
        debug_assert_eq!(region.formula().len(), self.dimension + 1);
        debug_assert!(region
            .constraints()
            .iter()
            .all(|constraint| constraint.prototype < self.prototypes.len()));
        self.regions.push(region);
    }

    fn contains(&self, region: &Region, point: &[f64]) -> bool {
        region.constraints.iter().all(|constraint| {
            let phi = self.prototypes[constraint.prototype].value(point);
            constraint.direction.holds(phi)
        })
    }

    /// Index of the first region containing `point`.
    pub fn region_index(&self, point: &[f64]) -> Result<usize, EvalError> {
        if point.len() != self.dimension {
            return Err(EvalError::DimensionMismatch {
                found: point.len(),
                dimension: self.dimension,
            });
        }

        self.regions
            .iter()
            .position(|region| self.contains(region, point))
            .ok_or_else(|| EvalError::NoRegionMatched {
                point: point.to_vec(),
            })
    }

    /// Evaluates the function at `point`.
    pub fn evaluate(&self, point: &[f64]) -> Result<f64, EvalError> {
        let index = self.region_index(point)?;
        Ok(self.regions[index].value(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fractions(pairs: &[(i64, i64)]) -> Vec<Fraction> {
        pairs.iter().map(|&(n, d)| Fraction::new(n, d)).collect()
    }

    #[test]
    fn affine_value_uses_stored_fractions() {
        let mut model = PwlModel::new(2);
        model.add_region(Region::new(fractions(&[(0, 1), (2, 1), (-1, 2)]), vec![]));

        assert_eq!(model.evaluate(&[1.0, 2.0]).unwrap(), 1.0);
    }

    #[test]
    fn unreduced_fraction() {
        let fraction = Fraction::new(2, 4);
        assert_eq!(fraction.numer, 2);
        assert_eq!(fraction.denom, 4);
        assert_eq!(fraction.to_f64(), 0.5);
        assert_eq!(fraction.to_string(), "2/4");
    }

    #[test]
    fn first_matching_region_wins() {
        let mut model = PwlModel::new(1);
        let split = model.add_prototype(BoundaryPrototype::new(vec![-0.5, 1.0]));
        model.add_region(Region::new(
            fractions(&[(0, 1), (1, 1)]),
            vec![BoundaryConstraint {
                prototype: split,
                direction: Direction::LessEq,
            }],
        ));
        model.add_region(Region::new(
            fractions(&[(1, 1), (-1, 1)]),
            vec![BoundaryConstraint {
                prototype: split,
                direction: Direction::GreaterEq,
            }],
        ));

        assert_eq!(model.region_index(&[0.25]).unwrap(), 0);
        assert_eq!(model.region_index(&[0.5]).unwrap(), 0);
        assert_eq!(model.region_index(&[0.75]).unwrap(), 1);

        // Both formulas agree on the shared boundary.
        assert_eq!(model.regions()[0].value(&[0.5]), 0.5);
        assert_eq!(model.regions()[1].value(&[0.5]), 0.5);
    }

    #[test]
    fn no_region_is_an_error() {
        let mut model = PwlModel::new(1);
        let split = model.add_prototype(BoundaryPrototype::new(vec![-0.5, 1.0]));
        model.add_region(Region::new(
            fractions(&[(0, 1), (1, 1)]),
            vec![BoundaryConstraint {
                prototype: split,
                direction: Direction::LessEq,
            }],
        ));

        match model.evaluate(&[0.75]) {
            Err(EvalError::NoRegionMatched { point }) => assert_eq!(point, vec![0.75]),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn wrong_point_dimension() {
        let mut model = PwlModel::new(2);
        model.add_region(Region::new(fractions(&[(0, 1), (1, 1), (1, 1)]), vec![]));

        match model.evaluate(&[0.5]) {
            Err(EvalError::DimensionMismatch {
                found: 1,
                dimension: 2,
            }) => (),
            other => panic!("Unexpected result {:?}", other),
        }
    }
}
