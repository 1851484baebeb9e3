//! Test data builders for creating datasets fluently.

use std::ops::RangeInclusive;

/// A fluent builder for creating test data.
///
/// # Example
/// ```
/// use slotline::testing::TestDataBuilder;
///
/// let data = TestDataBuilder::new()
///     .add_range(1..=10)
///     .add_value(100)
///     .add_repeated(42, 5)
///     .build();
///
/// assert_eq!(data.len(), 16); // 10 + 1 + 5
/// ```
#[derive(Default)]
pub struct TestDataBuilder<T> {
    data: Vec<T>,
}

impl<T> TestDataBuilder<T> {
    /// Create a new empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Add a single value.
    #[must_use]
    pub fn add_value(mut self, value: T) -> Self {
        self.data.push(value);
        self
    }

    /// Add multiple values.
    #[must_use]
    pub fn add_values(mut self, values: Vec<T>) -> Self {
        self.data.extend(values);
        self
    }

    /// Add a repeated value.
    #[must_use]
    pub fn add_repeated(mut self, value: T, count: usize) -> Self
    where
        T: Clone,
    {
        for _ in 0..count {
            self.data.push(value.clone());
        }
        self
    }

    /// Add one value per element of a range, through `From<i32>`.
    #[must_use]
    pub fn add_range(mut self, range: RangeInclusive<i32>) -> Self
    where
        T: From<i32>,
    {
        for i in range {
            self.data.push(T::from(i));
        }
        self
    }

    /// Add one generated value per index.
    #[must_use]
    pub fn add_generated<F: FnMut(usize) -> T>(mut self, count: usize, mut generate: F) -> Self {
        for i in 0..count {
            self.data.push(generate(i));
        }
        self
    }

    /// Build and return the dataset.
    #[must_use]
    pub fn build(self) -> Vec<T> {
        self.data
    }

    /// Current size of the dataset being built.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// True if nothing has been added yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Generate deterministic pseudo-random values with a fixed-seed LCG, so
/// "random" test data is reproducible across runs.
///
/// # Example
/// ```
/// use slotline::testing::pseudo_random_data;
///
/// let data = pseudo_random_data(10, 0, 100);
/// assert_eq!(data.len(), 10);
/// assert!(data.iter().all(|&v| (0..100).contains(&v)));
/// ```
#[must_use]
pub fn pseudo_random_data(count: usize, min: i32, max: i32) -> Vec<i32> {
    let mut data = Vec::with_capacity(count);
    let mut seed: u32 = 12345;
    let range = (max - min).unsigned_abs().max(1);
    for _ in 0..count {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let val = ((seed / 65536) % range) as i32 + min;
        data.push(val);
    }
    data
}
