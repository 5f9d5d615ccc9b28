/// A 2D raster grid with hard edges (no wrapping).
///
/// Cells are stored row-major; the flat index of `(x, y)` is `y * width + x`.
/// Every raster the allocation core touches shares one `Tilemap` shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build a tilemap from row-major data. Returns `None` if the length does not match.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    /// Build a tilemap by evaluating `f(x, y)` for every cell.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Flat row-major index of a cell.
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    /// Cell coordinates of a flat index.
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn same_shape<U>(&self, other: &Tilemap<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn get_index(&self, index: usize) -> &T {
        &self.data[index]
    }

    pub fn set_index(&mut self, index: usize, value: T) {
        self.data[index] = value;
    }

    /// Fill the entire map with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get 8-connected neighbors, clipped at the map edge.
    pub fn neighbors_8(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(8);

        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx >= 0 && ny >= 0 && (nx as usize) < self.width && (ny as usize) < self.height {
                    result.push((nx as usize, ny as usize));
                }
            }
        }

        result
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            (idx % width, idx / width, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            (idx % width, idx / width, val)
        })
    }

    /// Iterate over cell values in flat index order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Apply `f` to every cell, producing a new map of the same shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Tilemap<U> {
        Tilemap {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Combine two same-shaped maps cell by cell.
    ///
    /// Panics if the shapes differ; callers validate shapes up front.
    pub fn zip_map<U, V>(&self, other: &Tilemap<U>, mut f: impl FnMut(&T, &U) -> V) -> Tilemap<V> {
        assert!(self.same_shape(other), "tilemap shape mismatch");
        Tilemap {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        }
    }

    /// Count cells matching a predicate.
    pub fn count(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        self.data.iter().filter(|v| pred(v)).count()
    }
}

impl Tilemap<bool> {
    /// Cell-wise OR with another mask.
    pub fn union_with(&mut self, other: &Tilemap<bool>) {
        assert!(self.same_shape(other), "tilemap shape mismatch");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a = *a || *b;
        }
    }

    pub fn count_true(&self) -> usize {
        self.count(|v| *v)
    }
}

impl Tilemap<f32> {
    /// Minimum and maximum over all cells, ignoring NaN.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut min_v = f32::MAX;
        let mut max_v = f32::MIN;
        let mut any = false;
        for &v in &self.data {
            if v.is_nan() {
                continue;
            }
            any = true;
            if v < min_v { min_v = v; }
            if v > max_v { max_v = v; }
        }
        any.then_some((min_v, max_v))
    }

    /// Cell-wise `self += weight * other`.
    pub fn add_scaled(&mut self, other: &Tilemap<f32>, weight: f32) {
        assert!(self.same_shape(other), "tilemap shape mismatch");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += weight * *b;
        }
    }
}
