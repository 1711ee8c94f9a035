//! 1D mesh representation.
//!
//! A 1D mesh partitions an interval into elements. The parametric
//! coordinate `xi` in `[0, 1]` maps uniformly onto the elements, so a
//! point keeps its parametric location while the vertices move.

use crate::error::{Result, check_len};

/// 1D mesh of an interval with movable vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh1D {
    /// Left endpoint of domain
    pub x_min: f64,
    /// Right endpoint of domain
    pub x_max: f64,
    /// Number of elements
    pub n_elements: usize,
    /// vertices[k] is the left endpoint of element k; length n_elements + 1
    pub vertices: Vec<f64>,
    /// h[k] = vertices[k+1] - vertices[k]
    pub element_sizes: Vec<f64>,
}

impl Mesh1D {
    /// Create a uniform mesh of [x_min, x_max] with n_elements elements.
    pub fn uniform(x_min: f64, x_max: f64, n_elements: usize) -> Self {
        assert!(n_elements > 0, "Need at least one element");
        assert!(x_max > x_min, "x_max must be greater than x_min");

        let h = (x_max - x_min) / n_elements as f64;
        let vertices: Vec<f64> = (0..=n_elements).map(|i| x_min + i as f64 * h).collect();

        Self {
            x_min,
            x_max,
            n_elements,
            vertices,
            element_sizes: vec![h; n_elements],
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.n_elements + 1
    }

    /// Get total domain length.
    pub fn length(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Get minimum element size.
    pub fn h_min(&self) -> f64 {
        self.element_sizes
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Jacobian dx/dxi of element k for the uniform parametrization.
    pub fn jacobian(&self, k: usize) -> f64 {
        self.element_sizes[k] * self.n_elements as f64
    }

    /// Element containing parametric point `xi` and the local coordinate
    /// in `[0, 1]` within it.
    pub fn locate(&self, xi: f64) -> (usize, f64) {
        let scaled = xi.clamp(0.0, 1.0) * self.n_elements as f64;
        let k = (scaled.floor() as usize).min(self.n_elements - 1);
        (k, scaled - k as f64)
    }

    /// Move every vertex by the given nodal displacement.
    pub fn displace(&mut self, displacement: &[f64]) -> Result<()> {
        check_len("mesh vertex displacement", self.n_nodes(), displacement.len())?;
        for (x, d) in self.vertices.iter_mut().zip(displacement) {
            *x += d;
        }
        for k in 0..self.n_elements {
            self.element_sizes[k] = self.vertices[k + 1] - self.vertices[k];
        }
        self.x_min = self.vertices[0];
        self.x_max = self.vertices[self.n_elements];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_mesh() {
        let mesh = Mesh1D::uniform(0.0, 1.0, 4);

        assert_eq!(mesh.n_elements, 4);
        assert_eq!(mesh.vertices.len(), 5);
        assert!((mesh.h_min() - 0.25).abs() < 1e-14);
        assert!((mesh.jacobian(2) - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_locate() {
        let mesh = Mesh1D::uniform(0.0, 2.0, 4);
        assert_eq!(mesh.locate(0.0), (0, 0.0));
        let (k, r) = mesh.locate(0.6);
        assert_eq!(k, 2);
        assert!((r - 0.4).abs() < 1e-12);
        assert_eq!(mesh.locate(1.0), (3, 1.0));
    }

    #[test]
    fn test_displace() {
        let mut mesh = Mesh1D::uniform(0.0, 1.0, 2);
        mesh.displace(&[0.1, 0.0, -0.1]).unwrap();
        assert!((mesh.x_min - 0.1).abs() < 1e-14);
        assert!((mesh.x_max - 0.9).abs() < 1e-14);
        assert!((mesh.element_sizes[0] - 0.4).abs() < 1e-14);
        assert!(mesh.displace(&[0.0]).is_err());
    }
}
