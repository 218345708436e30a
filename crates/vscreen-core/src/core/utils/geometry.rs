use nalgebra::{Matrix3, Point3, Unit, Vector3};

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// A least-squares plane through a set of points.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub center: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
}

impl Plane {
    /// Fits a plane through at least three points; the normal is the direction of least variance.
    pub fn fit(points: &[Point3<f64>]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let center = centroid(points)?;
        let covariance = points.iter().fold(Matrix3::zeros(), |acc, p| {
            let d = p - center;
            acc + d * d.transpose()
        });
        let eigen = covariance.symmetric_eigen();
        let min_index = eigen.eigenvalues.imin();
        let normal = Unit::try_new(eigen.eigenvectors.column(min_index).into_owned(), 1e-12)?;
        Some(Self { center, normal })
    }

    pub fn distance_to(&self, point: &Point3<f64>) -> f64 {
        (point - self.center).dot(&self.normal).abs()
    }

    /// Orthogonal projection of a point onto the plane.
    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        let offset = (point - self.center).dot(&self.normal);
        point - self.normal.into_inner() * offset
    }
}

/// Angle between two vectors in degrees, in `[0, 180]`.
pub fn angle_degrees(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denominator = a.norm() * b.norm();
    if denominator == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denominator).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle between two plane normals folded into `[0, 90]`.
pub fn plane_angle_degrees(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let angle = angle_degrees(a, b);
    if angle > 90.0 { 180.0 - angle } else { angle }
}
