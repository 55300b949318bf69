//! Minimal dense tensor used by all layers and losses.
//!
//! Data is stored as a flat row-major `Vec<f64>` with an explicit shape vector.
//! Image-style layers use 4D `(batch, height, width, channels)` tensors; the
//! fully connected / loss stages use 2D `(batch, features)` or 1D `(features)`.

/// Row-major dense tensor of `f64` values.
///
/// Shape mismatches are programming errors and panic immediately rather than
/// being reported through a `Result`; every operation asserts the shapes it
/// requires.
///
/// # Example
///
/// ```
/// use cnn_from_scratch::tensor::Tensor;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]);
/// assert_eq!(t.dims2(), (2, 2));
/// assert_eq!(t.at2(1, 0), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f64>,
    shape: Vec<usize>,
}

impl Tensor {
    /// Create a tensor of the given shape filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            data: vec![0.0; len],
            shape: shape.to_vec(),
        }
    }

    /// Create a zero tensor with the same shape as `other`.
    pub fn zeros_like(other: &Tensor) -> Self {
        Self::zeros(&other.shape)
    }

    /// Wrap an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer length does not match the product of `shape`.
    pub fn from_vec(data: Vec<f64>, shape: &[usize]) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected,
            "data length {} does not match shape {:?}",
            data.len(),
            shape
        );
        Self {
            data,
            shape: shape.to_vec(),
        }
    }

    /// The shape as a slice of dimension sizes.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only view of the underlying buffer.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable view of the underlying buffer.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Dimensions of a 2D tensor as `(rows, cols)`.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2D.
    pub fn dims2(&self) -> (usize, usize) {
        assert_eq!(self.ndim(), 2, "expected a 2D tensor, got shape {:?}", self.shape);
        (self.shape[0], self.shape[1])
    }

    /// Dimensions of a 4D tensor as `(batch, height, width, channels)`.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 4D.
    pub fn dims4(&self) -> (usize, usize, usize, usize) {
        assert_eq!(self.ndim(), 4, "expected a 4D tensor, got shape {:?}", self.shape);
        (self.shape[0], self.shape[1], self.shape[2], self.shape[3])
    }

    #[inline]
    fn idx2(&self, r: usize, c: usize) -> usize {
        r * self.shape[1] + c
    }

    #[inline]
    fn idx4(&self, b: usize, y: usize, x: usize, c: usize) -> usize {
        ((b * self.shape[1] + y) * self.shape[2] + x) * self.shape[3] + c
    }

    /// Element of a 2D tensor.
    #[inline]
    pub fn at2(&self, r: usize, c: usize) -> f64 {
        self.data[self.idx2(r, c)]
    }

    /// Set an element of a 2D tensor.
    #[inline]
    pub fn set2(&mut self, r: usize, c: usize, value: f64) {
        let i = self.idx2(r, c);
        self.data[i] = value;
    }

    /// Element of a 4D tensor.
    #[inline]
    pub fn at4(&self, b: usize, y: usize, x: usize, c: usize) -> f64 {
        self.data[self.idx4(b, y, x, c)]
    }

    /// Set an element of a 4D tensor.
    #[inline]
    pub fn set4(&mut self, b: usize, y: usize, x: usize, c: usize, value: f64) {
        let i = self.idx4(b, y, x, c);
        self.data[i] = value;
    }

    /// Add to an element of a 4D tensor.
    #[inline]
    pub fn add4(&mut self, b: usize, y: usize, x: usize, c: usize, value: f64) {
        let i = self.idx4(b, y, x, c);
        self.data[i] += value;
    }

    /// Copy of this tensor with a new shape over the same data.
    ///
    /// # Panics
    ///
    /// Panics if the element count changes.
    pub fn reshaped(&self, shape: &[usize]) -> Tensor {
        let expected: usize = shape.iter().product();
        assert_eq!(
            self.data.len(),
            expected,
            "cannot reshape {:?} into {:?}",
            self.shape,
            shape
        );
        Tensor::from_vec(self.data.clone(), shape)
    }

    /// Zero-pad a 4D tensor by `padding` on each spatial side (height and
    /// width only; batch and channel dimensions are untouched).
    pub fn pad_spatial(&self, padding: usize) -> Tensor {
        let (batch, height, width, channels) = self.dims4();
        if padding == 0 {
            return self.clone();
        }

        let mut out = Tensor::zeros(&[batch, height + 2 * padding, width + 2 * padding, channels]);
        for b in 0..batch {
            for y in 0..height {
                for x in 0..width {
                    for c in 0..channels {
                        out.set4(b, y + padding, x + padding, c, self.at4(b, y, x, c));
                    }
                }
            }
        }
        out
    }

    /// Inverse of [`pad_spatial`](Self::pad_spatial): crop `padding` cells off
    /// each spatial side.
    ///
    /// # Panics
    ///
    /// Panics if the spatial extent is not larger than `2 * padding`.
    pub fn crop_spatial(&self, padding: usize) -> Tensor {
        let (batch, height, width, channels) = self.dims4();
        if padding == 0 {
            return self.clone();
        }
        assert!(
            height > 2 * padding && width > 2 * padding,
            "cannot crop padding {} from spatial extent {}x{}",
            padding,
            height,
            width
        );

        let mut out = Tensor::zeros(&[batch, height - 2 * padding, width - 2 * padding, channels]);
        let (_, out_h, out_w, _) = out.dims4();
        for b in 0..batch {
            for y in 0..out_h {
                for x in 0..out_w {
                    for c in 0..channels {
                        out.set4(b, y, x, c, self.at4(b, y + padding, x + padding, c));
                    }
                }
            }
        }
        out
    }
}
