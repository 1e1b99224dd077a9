//! # Bounding Volumes
//!
//! Axis-aligned bounding boxes for geometry and imported groups. Kept apart
//! from scene traversal: the dispatcher never culls, the viewer only uses
//! bounds to frame the camera on freshly imported meshes.

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl BoundingBox {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every position, `None` for an empty slice.
    pub fn from_positions(positions: &[Vector3<f32>]) -> Option<Self> {
        let (first, rest) = positions.split_first()?;
        let mut bounds = Self::new(*first, *first);
        for p in rest {
            bounds.include(*p);
        }
        Some(bounds)
    }

    fn include(&mut self, p: Vector3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Radius of the sphere through the corners.
    pub fn radius(&self) -> f32 {
        (self.max - self.min).magnitude() * 0.5
    }

    pub fn contains(&self, p: Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// True when the boxes share at least one point.
    pub fn overlap(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut bounds = *self;
        bounds.include(other.min);
        bounds.include(other.max);
        bounds
    }

    /// Bounds of the 8 transformed corners.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> BoundingBox {
        let corners = [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ];

        let projected: Vec<Vector3<f32>> = corners
            .iter()
            .map(|c| {
                let t = matrix * Vector4::new(c.x, c.y, c.z, 1.0);
                Vector3::new(t.x / t.w, t.y / t.w, t.z / t.w)
            })
            .collect();

        // eight corners, never empty
        Self::from_positions(&projected).unwrap_or(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    fn unit() -> BoundingBox {
        BoundingBox::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_from_positions() {
        assert_eq!(BoundingBox::from_positions(&[]), None);

        let bounds = BoundingBox::from_positions(&[
            Vector3::new(1.0, -2.0, 0.0),
            Vector3::new(-1.0, 3.0, 0.5),
            Vector3::new(0.0, 0.0, -4.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Vector3::new(-1.0, -2.0, -4.0));
        assert_eq!(bounds.max, Vector3::new(1.0, 3.0, 0.5));
        assert!(bounds.contains(Vector3::new(0.0, 0.0, 0.0)));
        assert!(!bounds.contains(Vector3::new(0.0, 4.0, 0.0)));
    }

    #[test]
    fn test_overlap_and_union() {
        let a = unit();
        let b = BoundingBox::new(Vector3::new(0.5, 0.5, 0.5), Vector3::new(3.0, 3.0, 3.0));
        let c = BoundingBox::new(Vector3::new(2.0, -1.0, -1.0), Vector3::new(3.0, 1.0, 1.0));

        assert!(a.overlap(&b));
        assert!(!a.overlap(&c));

        let u = a.union(&c);
        assert_eq!(u.min, a.min);
        assert_eq!(u.max, Vector3::new(3.0, 1.0, 1.0));
        assert_eq!(u.center(), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_transformed() {
        let moved = unit().transformed(&Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0)));
        assert_eq!(moved.center(), Vector3::new(5.0, 0.0, 0.0));

        let rotated = unit().transformed(&Matrix4::from_angle_y(Deg(45.0)));
        let half = 2f32.sqrt();
        assert!((rotated.max.x - half).abs() < 1e-5);
        assert!((rotated.max.y - 1.0).abs() < 1e-5);
    }
}
