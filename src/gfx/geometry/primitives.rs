//! # Primitive Shape Generation
//!
//! All shapes are centered at the origin, Y-up, with outward normals.

use cgmath::{InnerSpace, Vector3, Zero};
use std::f32::consts::PI;

use super::GeometryData;

/// Generate a pole-capped UV sphere.
///
/// The mesh holds a top vertex, `latitude_divisions - 1` rings of
/// `longitude_divisions` vertices each, and a bottom vertex. Normals are
/// smoothed from the face normals.
pub fn generate_sphere(longitude_divisions: u32, latitude_divisions: u32, radius: f32) -> GeometryData {
    let long_divs = longitude_divisions.max(3);
    let lat_divs = latitude_divisions.max(2);
    let long_inc = 2.0 * PI / long_divs as f32;
    let lat_inc = PI / lat_divs as f32;

    let mut positions = Vec::with_capacity((2 + (lat_divs - 1) * long_divs) as usize);
    positions.push(Vector3::new(0.0, radius, 0.0));
    for lat in 1..lat_divs {
        let lat_angle = lat as f32 * lat_inc;
        for long in 0..long_divs {
            let long_angle = long as f32 * long_inc;
            positions.push(Vector3::new(
                radius * long_angle.cos() * lat_angle.sin(),
                radius * lat_angle.cos(),
                radius * long_angle.sin() * lat_angle.sin(),
            ));
        }
    }
    positions.push(Vector3::new(0.0, -radius, 0.0));

    // ring r, column c -> vertex index
    let ring = |r: u32, c: u32| 1 + r * long_divs + c % long_divs;
    let mut indices = Vec::with_capacity((6 * long_divs * (lat_divs - 1)) as usize);

    // top cap
    for long in 0..long_divs {
        indices.extend_from_slice(&[0, ring(0, long + 1), ring(0, long)]);
    }

    // body
    for lat in 0..lat_divs - 2 {
        for long in 0..long_divs {
            let current = ring(lat, long);
            let next = ring(lat, long + 1);
            let below = ring(lat + 1, long);
            let below_next = ring(lat + 1, long + 1);
            indices.extend_from_slice(&[current, next, below, next, below_next, below]);
        }
    }

    // bottom cap
    let bottom = 1 + (lat_divs - 1) * long_divs;
    for long in 0..long_divs {
        indices.extend_from_slice(&[ring(lat_divs - 2, long), ring(lat_divs - 2, long + 1), bottom]);
    }

    let normals = compute_vertex_normals(&positions, &indices);
    GeometryData {
        positions,
        normals,
        indices,
    }
}

/// Generate a unit cube with flat-shaded faces.
pub fn generate_cube() -> GeometryData {
    let faces: [(Vector3<f32>, Vector3<f32>, Vector3<f32>); 6] = [
        // normal, u axis, v axis (u x v == normal)
        (Vector3::unit_z(), Vector3::unit_x(), Vector3::unit_y()),
        (-Vector3::unit_z(), Vector3::unit_y(), Vector3::unit_x()),
        (-Vector3::unit_x(), Vector3::unit_z(), Vector3::unit_y()),
        (Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()),
        (Vector3::unit_y(), Vector3::unit_z(), Vector3::unit_x()),
        (-Vector3::unit_y(), Vector3::unit_x(), Vector3::unit_z()),
    ];

    let mut data = GeometryData::new();
    for (normal, u, v) in faces {
        let base = data.positions.len() as u32;
        let center = normal * 0.5;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            data.positions.push(center + u * su + v * sv);
            data.normals.push(normal);
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    data
}

/// Accumulates face normals onto their vertices and normalizes the sums.
///
/// Vertices referenced by no (or only degenerate) triangles keep a zero normal.
pub fn compute_vertex_normals(positions: &[Vector3<f32>], indices: &[u32]) -> Vec<Vector3<f32>> {
    let mut normals = vec![Vector3::zero(); positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let (Some(p0), Some(p1), Some(p2)) = (positions.get(i0), positions.get(i1), positions.get(i2)) else {
            continue;
        };

        let face = (p1 - p0).cross(p2 - p1);
        if face.magnitude2() == 0.0 {
            continue;
        }
        let face = face.normalize();
        normals[i0] += face;
        normals[i1] += face;
        normals[i2] += face;
    }

    for normal in &mut normals {
        if normal.magnitude2() > 0.0 {
            *normal = normal.normalize();
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_generation() {
        let sphere = generate_sphere(16, 8, 0.1);
        assert_eq!(sphere.vertex_count(), 2 + 7 * 16);
        // two caps plus two triangles per body quad
        assert_eq!(sphere.triangle_count(), 2 * 16 + 2 * 16 * 6);
        assert_eq!(sphere.normals.len(), sphere.positions.len());
        assert!(sphere.indices.iter().all(|&i| (i as usize) < sphere.vertex_count()));

        for p in &sphere.positions {
            assert!((p.magnitude() - 0.1).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_normals_point_outward() {
        let sphere = generate_sphere(12, 6, 2.0);
        for (p, n) in sphere.positions.iter().zip(&sphere.normals) {
            assert!((n.magnitude() - 1.0).abs() < 1e-4);
            assert!(p.normalize().dot(*n) > 0.9, "normal {:?} at {:?}", n, p);
        }
    }

    #[test]
    fn test_cube_generation() {
        let cube = generate_cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);

        // winding agrees with the stored normals
        let computed = compute_vertex_normals(&cube.positions, &cube.indices);
        for (a, b) in computed.iter().zip(&cube.normals) {
            assert!((a - b).magnitude() < 1e-5);
        }
    }

    #[test]
    fn test_normals_skip_degenerate_and_unused() {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(5.0, 5.0, 5.0),
        ];
        let normals = compute_vertex_normals(&positions, &[0, 1, 2, 0, 0, 1]);
        assert_eq!(normals[0], Vector3::unit_z());
        assert_eq!(normals[3], Vector3::zero());
    }
}
