use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

/// A 2D vector used throughout the afines engine for bead positions, forces and
/// segment displacements.
///
/// Unlike `bioshell_numerical::Vec3`, this type carries no payload fields: beads
/// and springs store their own chain/type bookkeeping separately, so `Vec2` stays
/// a plain geometric value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Vec2 {
        Vec2 { x, y }
    }

    pub fn from_float(value: f64) -> Vec2 {
        Vec2 { x: value, y: value }
    }

    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn dot(&self, rhs: &Vec2) -> f64 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// The scalar z-component of the 3D cross product of two in-plane vectors.
    pub fn cross(&self, rhs: &Vec2) -> f64 {
        self.x * rhs.y - self.y * rhs.x
    }

    /// Returns a unit vector along `self`, or the zero vector when `self` has zero length.
    pub fn normalized(&self) -> Vec2 {
        let len = self.length();
        if len == 0.0 {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// The outer product `self ⊗ rhs`, used to accumulate virial tensors.
    pub fn outer(&self, rhs: &Vec2) -> Mat2x2 {
        Mat2x2 {
            xx: self.x * rhs.x,
            xy: self.x * rhs.y,
            yx: self.y * rhs.x,
            yy: self.y * rhs.y,
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

/// A 2x2 tensor, used to hold the virial (stress) contributions of the various
/// interactions (`xx`, `xy`, `yx`, `yy` laid out the way the output file format expects).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mat2x2 {
    pub xx: f64,
    pub xy: f64,
    pub yx: f64,
    pub yy: f64,
}

impl Mat2x2 {
    pub const ZERO: Mat2x2 = Mat2x2 { xx: 0.0, xy: 0.0, yx: 0.0, yy: 0.0 };

    pub fn new(xx: f64, xy: f64, yx: f64, yy: f64) -> Mat2x2 {
        Mat2x2 { xx, xy, yx, yy }
    }
}

impl Add for Mat2x2 {
    type Output = Mat2x2;
    fn add(self, rhs: Mat2x2) -> Mat2x2 {
        Mat2x2::new(self.xx + rhs.xx, self.xy + rhs.xy, self.yx + rhs.yx, self.yy + rhs.yy)
    }
}

impl AddAssign for Mat2x2 {
    fn add_assign(&mut self, rhs: Mat2x2) {
        self.xx += rhs.xx;
        self.xy += rhs.xy;
        self.yx += rhs.yx;
        self.yy += rhs.yy;
    }
}

impl Index<usize> for Vec2 {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => panic!("Vec2 index out of range: {i}"),
        }
    }
}

impl IndexMut<usize> for Vec2 {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => panic!("Vec2 index out of range: {i}"),
        }
    }
}
