//! JSON-stat cube decoding.
//!
//! A JSON-stat dataset is a flattened N-dimensional statistical cube: an
//! ordered list of dimensions, each with an ordered set of category codes,
//! and a value store addressed by a single flat index in row-major order
//! (last dimension fastest). This module turns such a cube into one row per
//! observation, which is the shape every downstream writer wants.

use std::collections::HashMap;
use thiserror::Error;

/// Category code substituted when a dimension reports no categories at all.
///
/// Eurostat occasionally returns a dimension with an empty category index;
/// the cube is still decodable if that axis is treated as a single
/// placeholder category.
pub const PLACEHOLDER_CODE: &str = "_missing_";

/// Errors that can occur while decoding a cube.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The cube declares no dimensions.
    #[error("invalid cube: dimension list is empty")]
    EmptyDimensions,

    /// A dimension's declared size disagrees with its resolved category count.
    #[error("invalid cube: dimension '{name}' declares size {declared} but resolves {resolved} categories")]
    SizeMismatch {
        name: String,
        declared: usize,
        resolved: usize,
    },

    /// A position in `0..=max_pos` has no category code assigned to it.
    #[error("invalid cube: dimension '{name}' has no category at position {position}")]
    PositionGap { name: String, position: usize },

    /// Two category codes claim the same position.
    #[error("invalid cube: dimension '{name}' assigns position {position} to more than one category")]
    DuplicatePosition { name: String, position: usize },

    /// A dense value store holds the wrong number of entries.
    #[error("invalid cube: dense value store holds {actual} entries but the cube addresses {expected} positions")]
    ValueCountMismatch { expected: usize, actual: usize },

    /// The value store is neither a dense sequence nor a sparse mapping.
    #[error("invalid cube: unsupported value store: {0}")]
    UnsupportedValueStore(String),

    /// Stride arithmetic produced an out-of-range coordinate.
    ///
    /// This indicates an internal invariant violation and is checked rather
    /// than allowed to turn into a wrong row.
    #[error("malformed coordinate: index {index} out of range for dimension '{dimension}' ({len} categories)")]
    MalformedCoordinate {
        dimension: String,
        index: usize,
        len: usize,
    },
}

/// Coarse classification of a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A structural precondition of the cube was violated.
    InvalidCube,
    /// An internal consistency check failed during stride decoding.
    MalformedCoordinate,
}

impl DecodeError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            Self::MalformedCoordinate { .. } => DecodeErrorKind::MalformedCoordinate,
            _ => DecodeErrorKind::InvalidCube,
        }
    }
}

/// How a dimension's category codes are supplied.
#[derive(Debug, Clone)]
pub enum CategoryIndex {
    /// Codes keyed by their integer position, as JSON-stat's
    /// `category.index` object form. Positions must densely cover
    /// `0..=max_pos`.
    Mapped(HashMap<String, usize>),
    /// Codes already in positional order (JSON-stat's array form).
    Ordered(Vec<String>),
}

impl CategoryIndex {
    /// Returns true if no categories are supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Mapped(map) => map.is_empty(),
            Self::Ordered(codes) => codes.is_empty(),
        }
    }
}

/// One axis of a cube.
#[derive(Debug, Clone)]
pub struct Dimension {
    /// Dimension identifier, e.g. `geo` or `time`.
    pub name: String,
    /// Declared number of categories along this axis.
    pub size: usize,
    /// The category codes.
    pub index: CategoryIndex,
}

impl Dimension {
    /// Create a dimension from an ordered category list.
    #[must_use]
    pub fn ordered(name: impl Into<String>, codes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            size: codes.len(),
            index: CategoryIndex::Ordered(codes),
        }
    }

    /// Resolve the ordered category list for this dimension.
    ///
    /// An empty index resolves to a single placeholder category regardless
    /// of the declared size. A mapped index is inverted position -> code;
    /// gaps and duplicate positions fail loudly instead of silently
    /// mis-mapping later coordinates.
    fn resolve_categories(&self) -> Result<Vec<String>, DecodeError> {
        if self.index.is_empty() {
            return Ok(vec![PLACEHOLDER_CODE.to_string()]);
        }

        let codes = match &self.index {
            CategoryIndex::Ordered(codes) => codes.clone(),
            CategoryIndex::Mapped(map) => {
                let mut by_position: HashMap<usize, &str> = HashMap::with_capacity(map.len());
                for (code, &position) in map {
                    if by_position.insert(position, code).is_some() {
                        return Err(DecodeError::DuplicatePosition {
                            name: self.name.clone(),
                            position,
                        });
                    }
                }
                // max_pos is derived from the supplied positions; every
                // position up to it must be present.
                let max_pos = by_position.keys().copied().max().unwrap_or(0);
                let mut ordered = Vec::with_capacity(max_pos + 1);
                for position in 0..=max_pos {
                    match by_position.get(&position) {
                        Some(code) => ordered.push((*code).to_string()),
                        None => {
                            return Err(DecodeError::PositionGap {
                                name: self.name.clone(),
                                position,
                            })
                        }
                    }
                }
                ordered
            }
        };

        if codes.len() != self.size {
            return Err(DecodeError::SizeMismatch {
                name: self.name.clone(),
                declared: self.size,
                resolved: codes.len(),
            });
        }
        Ok(codes)
    }
}

/// The value store of a cube.
#[derive(Debug, Clone)]
pub enum ValueStore {
    /// One entry per flat position; `None` means "no observation".
    Dense(Vec<Option<f64>>),
    /// Values keyed by decimal flat-position string; absent keys mean
    /// "no observation". Whether a key was explicitly null or never present
    /// is deliberately not distinguishable.
    Sparse(HashMap<String, f64>),
}

impl ValueStore {
    /// Look up the value at a flat position, if present.
    #[must_use]
    pub fn get(&self, flat: usize) -> Option<f64> {
        match self {
            Self::Dense(values) => values.get(flat).copied().flatten(),
            Self::Sparse(values) => values.get(&flat.to_string()).copied(),
        }
    }

    /// Number of positions that carry a value.
    #[must_use]
    pub fn present(&self) -> usize {
        match self {
            Self::Dense(values) => values.iter().filter(|v| v.is_some()).count(),
            Self::Sparse(values) => values.len(),
        }
    }
}

/// A flattened N-dimensional statistical dataset.
#[derive(Debug, Clone)]
pub struct Cube {
    /// Dimensions in declared order; the order defines the flattening.
    pub dimensions: Vec<Dimension>,
    /// The value store.
    pub values: ValueStore,
}

/// One decoded data point: a category code per dimension plus the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// `(dimension name, category code)` pairs in cube dimension order.
    pub coordinates: Vec<(String, String)>,
    /// The observed value, passed through unchanged.
    pub value: f64,
}

impl Observation {
    /// The category code selected along `dimension`, if the cube has it.
    #[must_use]
    pub fn category(&self, dimension: &str) -> Option<&str> {
        self.coordinates
            .iter()
            .find(|(name, _)| name == dimension)
            .map(|(_, code)| code.as_str())
    }
}

impl Cube {
    /// Decode the cube into one observation per flat position that carries
    /// a value, in flat-position (row-major) order.
    ///
    /// The decoder is a pure function over its input: it performs no I/O,
    /// holds no state across calls, and may run concurrently on independent
    /// cubes.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] of kind `InvalidCube` when a structural
    /// precondition is violated, or `MalformedCoordinate` if stride
    /// arithmetic produces an out-of-range index.
    pub fn decode(&self) -> Result<Vec<Observation>, DecodeError> {
        if self.dimensions.is_empty() {
            return Err(DecodeError::EmptyDimensions);
        }

        let categories: Vec<Vec<String>> = self
            .dimensions
            .iter()
            .map(Dimension::resolve_categories)
            .collect::<Result<_, _>>()?;

        let total: usize = categories.iter().map(Vec::len).product();
        if let ValueStore::Dense(values) = &self.values {
            if values.len() != total {
                return Err(DecodeError::ValueCountMismatch {
                    expected: total,
                    actual: values.len(),
                });
            }
        }

        // Row-major strides: last dimension fastest.
        let mut strides = vec![1usize; categories.len()];
        let mut acc = 1usize;
        for (stride, codes) in strides.iter_mut().zip(&categories).rev() {
            *stride = acc;
            acc *= codes.len();
        }

        let mut observations = Vec::with_capacity(self.values.present());
        for flat in 0..total {
            let Some(value) = self.values.get(flat) else {
                // Missing observations are expected, not an error.
                continue;
            };

            let mut remaining = flat;
            let mut coordinates = Vec::with_capacity(self.dimensions.len());
            for ((dimension, codes), &stride) in
                self.dimensions.iter().zip(&categories).zip(&strides)
            {
                let index = remaining / stride;
                remaining %= stride;
                let code =
                    codes
                        .get(index)
                        .ok_or_else(|| DecodeError::MalformedCoordinate {
                            dimension: dimension.name.clone(),
                            index,
                            len: codes.len(),
                        })?;
                coordinates.push((dimension.name.clone(), code.clone()));
            }
            observations.push(Observation {
                coordinates,
                value,
            });
        }

        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo_time_cube(values: ValueStore) -> Cube {
        Cube {
            dimensions: vec![
                Dimension::ordered("geo", vec!["A".into(), "B".into()]),
                Dimension::ordered(
                    "time",
                    vec!["2020".into(), "2021".into(), "2022".into()],
                ),
            ],
            values,
        }
    }

    fn codes(observation: &Observation) -> (String, String) {
        (
            observation.category("geo").unwrap().to_string(),
            observation.category("time").unwrap().to_string(),
        )
    }

    #[test]
    fn test_decode_dense_2x3() {
        let cube = geo_time_cube(ValueStore::Dense(
            (1..=6).map(|v| Some(f64::from(v))).collect(),
        ));
        let observations = cube.decode().unwrap();
        assert_eq!(observations.len(), 6);

        let expected = [
            ("A", "2020", 1.0),
            ("A", "2021", 2.0),
            ("A", "2022", 3.0),
            ("B", "2020", 4.0),
            ("B", "2021", 5.0),
            ("B", "2022", 6.0),
        ];
        for (observation, (geo, time, value)) in observations.iter().zip(expected) {
            assert_eq!(codes(observation), (geo.to_string(), time.to_string()));
            assert_eq!(observation.value, value);
        }
    }

    #[test]
    fn test_decode_sparse_equivalence() {
        let sparse: HashMap<String, f64> = [("0", 1.0), ("3", 4.0), ("5", 6.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let cube = geo_time_cube(ValueStore::Sparse(sparse));
        let observations = cube.decode().unwrap();

        assert_eq!(observations.len(), 3);
        assert_eq!(codes(&observations[0]), ("A".into(), "2020".into()));
        assert_eq!(observations[0].value, 1.0);
        assert_eq!(codes(&observations[1]), ("B".into(), "2020".into()));
        assert_eq!(observations[1].value, 4.0);
        assert_eq!(codes(&observations[2]), ("B".into(), "2022".into()));
        assert_eq!(observations[2].value, 6.0);
    }

    #[test]
    fn test_decode_dense_skips_missing() {
        let cube = geo_time_cube(ValueStore::Dense(vec![
            Some(1.0),
            None,
            Some(3.0),
            None,
            None,
            Some(6.0),
        ]));
        let observations = cube.decode().unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(codes(&observations[1]), ("A".into(), "2022".into()));
    }

    #[test]
    fn test_decode_mapped_index() {
        let geo: HashMap<String, usize> =
            [("B".to_string(), 1), ("A".to_string(), 0)].into_iter().collect();
        let cube = Cube {
            dimensions: vec![
                Dimension {
                    name: "geo".into(),
                    size: 2,
                    index: CategoryIndex::Mapped(geo),
                },
                Dimension::ordered("time", vec!["2020".into()]),
            ],
            values: ValueStore::Dense(vec![Some(10.0), Some(20.0)]),
        };
        let observations = cube.decode().unwrap();
        assert_eq!(observations[0].category("geo"), Some("A"));
        assert_eq!(observations[1].category("geo"), Some("B"));
    }

    #[test]
    fn test_empty_dimension_becomes_placeholder() {
        let cube = Cube {
            dimensions: vec![
                Dimension {
                    name: "unit".into(),
                    size: 4,
                    index: CategoryIndex::Mapped(HashMap::new()),
                },
                Dimension::ordered("geo", vec!["A".into(), "B".into()]),
            ],
            values: ValueStore::Dense(vec![Some(1.0), Some(2.0)]),
        };
        let observations = cube.decode().unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].category("unit"), Some(PLACEHOLDER_CODE));
        assert_eq!(observations[0].category("geo"), Some("A"));
        assert_eq!(observations[1].category("geo"), Some("B"));
    }

    #[test]
    fn test_empty_dimension_list_fails() {
        let cube = Cube {
            dimensions: vec![],
            values: ValueStore::Dense(vec![]),
        };
        let err = cube.decode().unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidCube);
        assert!(matches!(err, DecodeError::EmptyDimensions));
    }

    #[test]
    fn test_dense_length_mismatch_fails() {
        let cube = geo_time_cube(ValueStore::Dense(vec![Some(1.0), Some(2.0)]));
        let err = cube.decode().unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidCube);
        assert!(matches!(
            err,
            DecodeError::ValueCountMismatch {
                expected: 6,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_declared_size_mismatch_fails() {
        let cube = Cube {
            dimensions: vec![Dimension {
                name: "geo".into(),
                size: 3,
                index: CategoryIndex::Ordered(vec!["A".into(), "B".into()]),
            }],
            values: ValueStore::Dense(vec![Some(1.0), Some(2.0), Some(3.0)]),
        };
        let err = cube.decode().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::SizeMismatch {
                declared: 3,
                resolved: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_position_gap_fails() {
        let geo: HashMap<String, usize> =
            [("A".to_string(), 0), ("C".to_string(), 2)].into_iter().collect();
        let cube = Cube {
            dimensions: vec![Dimension {
                name: "geo".into(),
                size: 3,
                index: CategoryIndex::Mapped(geo),
            }],
            values: ValueStore::Sparse(HashMap::new()),
        };
        let err = cube.decode().unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidCube);
        assert!(matches!(err, DecodeError::PositionGap { position: 1, .. }));
    }

    #[test]
    fn test_duplicate_position_fails() {
        let geo: HashMap<String, usize> =
            [("A".to_string(), 0), ("B".to_string(), 0)].into_iter().collect();
        let cube = Cube {
            dimensions: vec![Dimension {
                name: "geo".into(),
                size: 1,
                index: CategoryIndex::Mapped(geo),
            }],
            values: ValueStore::Sparse(HashMap::new()),
        };
        let err = cube.decode().unwrap_err();
        assert!(matches!(err, DecodeError::DuplicatePosition { position: 0, .. }));
    }

    #[test]
    fn test_sparse_ignores_out_of_range_keys() {
        let sparse: HashMap<String, f64> = [("0".to_string(), 1.0), ("99".to_string(), 9.0)]
            .into_iter()
            .collect();
        let cube = geo_time_cube(ValueStore::Sparse(sparse));
        let observations = cube.decode().unwrap();
        // Keys outside the addressable range are never visited.
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].value, 1.0);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let cube = geo_time_cube(ValueStore::Dense(
            (1..=6).map(|v| Some(f64::from(v))).collect(),
        ));
        let first = cube.decode().unwrap();
        let second = cube.decode().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_three_dimensions_row_major_order() {
        let cube = Cube {
            dimensions: vec![
                Dimension::ordered("a", vec!["a0".into(), "a1".into()]),
                Dimension::ordered("b", vec!["b0".into(), "b1".into()]),
                Dimension::ordered("c", vec!["c0".into(), "c1".into()]),
            ],
            values: ValueStore::Dense((0..8).map(|v| Some(f64::from(v))).collect()),
        };
        let observations = cube.decode().unwrap();
        assert_eq!(observations.len(), 8);
        // Flat position 5 = a1, b0, c1.
        assert_eq!(observations[5].category("a"), Some("a1"));
        assert_eq!(observations[5].category("b"), Some("b0"));
        assert_eq!(observations[5].category("c"), Some("c1"));
        assert_eq!(observations[5].value, 5.0);
    }
}
