//! Linear algebra type aliases, geometric tolerances and placement helpers.

pub type Point3 = nalgebra::Point3<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Isometry3 = nalgebra::Isometry3<f64>;

/// Default tolerance stored on vertices and edges (model units).
pub const TOLERANCE: f64 = 1e-7;

/// Parametric tolerance for curve parameter comparisons.
pub const PARAM_TOL: f64 = 1e-12;

/// Compute an orthonormal frame (u, v) in the plane perpendicular to `axis`.
///
/// The same frame is used by every writer, so circle and surface
/// parameterizations agree across formats.
pub fn plane_frame(axis: &Vector3) -> (Vector3, Vector3) {
    let a = axis.normalize();
    let seed = if a.x.abs() < 0.9 {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        Vector3::new(0.0, 1.0, 0.0)
    };
    let u = a.cross(&seed).normalize();
    let v = a.cross(&u);
    (u, v)
}

/// Maps kernel geometry into exported model space: rigid placement of the
/// root shape followed by a uniform unit scale.
#[derive(Clone, Copy, Debug)]
pub struct ModelTransform {
    pub placement: Isometry3,
    pub scale: f64,
}

impl ModelTransform {
    pub fn new(placement: Isometry3, scale: f64) -> Self {
        Self { placement, scale }
    }

    pub fn identity() -> Self {
        Self::new(Isometry3::identity(), 1.0)
    }

    pub fn point(&self, p: &Point3) -> Point3 {
        Point3::from(self.placement.transform_point(p).coords * self.scale)
    }

    /// Rotate a direction; the result keeps its length.
    pub fn direction(&self, d: &Vector3) -> Vector3 {
        self.placement.transform_vector(d)
    }

    /// Rotate and scale a vector that carries a length (e.g. a line's extent).
    pub fn vector(&self, d: &Vector3) -> Vector3 {
        self.placement.transform_vector(d) * self.scale
    }

    pub fn length(&self, l: f64) -> f64 {
        l * self.scale
    }
}

/// True if all three components are finite.
pub fn is_finite3(v: &Vector3) -> bool {
    v.iter().all(|c| c.is_finite())
}
