use crate::error::{Error, Result};

/// A single one-dimensional slice within a [`NumericRange`], inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub min: u32,
    pub max: u32,
}

impl Dimension {
    #[must_use]
    pub const fn single(index: u32) -> Self {
        Self {
            min: index,
            max: index,
        }
    }

    #[must_use]
    pub const fn span(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        (self.max - self.min + 1) as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }
}

/// A set of one-dimensional slices applied outer-dimension-first to an array value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NumericRange {
    dimensions: Vec<Dimension>,
}

impl NumericRange {
    #[must_use]
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self { dimensions }
    }

    #[must_use]
    pub fn single_dimension(min: u32, max: u32) -> Self {
        Self::new(vec![Dimension::span(min, max)])
    }

    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Parses the OPC UA textual numeric-range syntax, e.g. `"1:3"` or `"0:1,2:4"`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::RangeInvalid`](crate::error::ErrorKind::RangeInvalid) if any
    /// dimension is malformed or a span's upper bound precedes its lower bound.
    pub fn parse(text: &str) -> Result<Self> {
        let mut dimensions = Vec::new();
        for part in text.split(',') {
            let dimension = if let Some((min, max)) = part.split_once(':') {
                let min: u32 = min
                    .parse()
                    .map_err(|_| Error::range_invalid(format!("invalid range bound: {part}")))?;
                let max: u32 = max
                    .parse()
                    .map_err(|_| Error::range_invalid(format!("invalid range bound: {part}")))?;
                if max < min {
                    return Err(Error::range_invalid(format!(
                        "range upper bound precedes lower bound: {part}"
                    )));
                }
                Dimension::span(min, max)
            } else {
                let index: u32 = part
                    .parse()
                    .map_err(|_| Error::range_invalid(format!("invalid range index: {part}")))?;
                Dimension::single(index)
            };
            dimensions.push(dimension);
        }
        if dimensions.is_empty() {
            return Err(Error::range_invalid("empty numeric range"));
        }
        Ok(Self::new(dimensions))
    }

    /// Applies this range (outer-dimension-first) to a flat slice, returning the selected
    /// elements in order.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::RangeInvalid`](crate::error::ErrorKind::RangeInvalid) if the range
    /// has more than one dimension (arrays here are modeled as flat, single-dimension values) or
    /// any bound falls outside `slice`.
    pub fn slice<'a, T>(&self, slice: &'a [T]) -> Result<&'a [T]> {
        let [dimension] = self.dimensions.as_slice() else {
            return Err(Error::range_invalid(
                "multi-dimensional ranges are not supported by this store",
            ));
        };
        let (min, max) = (dimension.min as usize, dimension.max as usize);
        if max >= slice.len() {
            return Err(Error::range_invalid(format!(
                "range {min}:{max} out of bounds for length {}",
                slice.len()
            )));
        }
        Ok(&slice[min..=max])
    }

    /// Writes `values` into `target` at the positions selected by this range.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::RangeInvalid`](crate::error::ErrorKind::RangeInvalid) if the range is
    /// multi-dimensional, out of bounds, or its length does not match `values`.
    pub fn splice<T: Clone>(&self, target: &mut [T], values: &[T]) -> Result<()> {
        let [dimension] = self.dimensions.as_slice() else {
            return Err(Error::range_invalid(
                "multi-dimensional ranges are not supported by this store",
            ));
        };
        let (min, max) = (dimension.min as usize, dimension.max as usize);
        if max >= target.len() {
            return Err(Error::range_invalid(format!(
                "range {min}:{max} out of bounds for length {}",
                target.len()
            )));
        }
        if values.len() != dimension.len() {
            return Err(Error::range_invalid(format!(
                "range {min}:{max} expects {} values, got {}",
                dimension.len(),
                values.len()
            )));
        }
        target[min..=max].clone_from_slice(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_span() {
        let range = NumericRange::parse("1:3").expect("valid range");
        assert_eq!(range.dimensions(), &[Dimension::span(1, 3)]);
    }

    #[test]
    fn rejects_inverted_span() {
        assert!(NumericRange::parse("3:1").is_err());
    }

    #[test]
    fn slices_and_splices_round_trip() {
        let range = NumericRange::single_dimension(1, 3);
        let data = [0, 10, 20, 30, 0, 0, 0, 0, 0, 0];
        assert_eq!(range.slice(&data).expect("in bounds"), &[10, 20, 30]);

        let mut target = [0; 10];
        range
            .splice(&mut target, &[10, 20, 30])
            .expect("splice ok");
        assert_eq!(target, [0, 10, 20, 30, 0, 0, 0, 0, 0, 0]);
    }
}
