//! Common types and traits for parcel geometry.
//!
//! All measurements are whole centimetres and grams. Volumes are cm³.

/// Three integer edge lengths in centimetres (length, width, height).
///
/// # Examples
/// ```
/// use parcel_packer::types::Dims3;
///
/// let dims = Dims3::new(15, 20, 10);
/// assert_eq!(dims.volume(), 3000);
/// assert_eq!(dims.sorted_desc(), [20, 15, 10]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dims3 {
    pub length: u64,
    pub width: u64,
    pub height: u64,
}

impl Dims3 {
    #[inline]
    pub const fn new(length: u64, width: u64, height: u64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Product of all three edges. Saturates instead of overflowing.
    #[inline]
    pub fn volume(&self) -> u64 {
        self.length
            .saturating_mul(self.width)
            .saturating_mul(self.height)
    }

    /// Edges sorted from longest to shortest.
    #[inline]
    pub fn sorted_desc(&self) -> [u64; 3] {
        let mut edges = [self.length, self.width, self.height];
        edges.sort_unstable_by(|a, b| b.cmp(a));
        edges
    }

    /// Checks whether these edges fit into `outer` when both are compared
    /// longest-to-longest.
    ///
    /// This is a necessary condition for a physical fit, not a sufficient
    /// one: an item of 19×19×1 passes against a 20×20×1 box as well as
    /// against 20×1×20.
    #[inline]
    pub fn fits_sorted_within(&self, outer: &Self) -> bool {
        let inner = self.sorted_desc();
        let outer = outer.sorted_desc();
        inner.iter().zip(outer.iter()).all(|(i, o)| i <= o)
    }

    /// Grows every edge by `padding` centimetres, never below 1.
    #[inline]
    pub fn padded(&self, padding: u64) -> Self {
        Self::new(
            self.length.saturating_add(padding).max(1),
            self.width.saturating_add(padding).max(1),
            self.height.saturating_add(padding).max(1),
        )
    }
}

impl From<(u64, u64, u64)> for Dims3 {
    #[inline]
    fn from(tuple: (u64, u64, u64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

impl From<Dims3> for (u64, u64, u64) {
    #[inline]
    fn from(dims: Dims3) -> Self {
        (dims.length, dims.width, dims.height)
    }
}

/// Trait for anything with three edge lengths.
pub trait Dimensional {
    /// Returns the edges.
    fn dimensions(&self) -> Dims3;

    /// Volume in cm³.
    fn volume(&self) -> u64 {
        self.dimensions().volume()
    }
}

/// Trait for anything with a weight in grams.
pub trait Weighted {
    /// Returns the weight in grams.
    fn weight_grams(&self) -> u64;
}
