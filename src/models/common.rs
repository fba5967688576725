use glam::{Mat3, Quat, Vec3};

/// 軸平行境界ボックス（AABB）
///
/// ワールド空間での軸平行な直方体領域を表します。
/// 水槽境界判定、障害物の包含判定、レイ交差判定の基礎となります。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// 最小コーナー
    pub min: Vec3,
    /// 最大コーナー
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// 中心と各軸半径からAABBを構築
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// 中心座標
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// 各軸の全長
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// 点の包含判定（境界面上も含む）
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// 2つのAABBを包む最小のAABB
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// 8つのコーナー座標
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// 点群を包む最小のAABB（空の場合はNone）
    pub fn from_points(points: &[Vec3]) -> Option<Aabb> {
        let first = *points.first()?;
        let mut aabb = Aabb {
            min: first,
            max: first,
        };
        for p in &points[1..] {
            aabb.min = aabb.min.min(*p);
            aabb.max = aabb.max.max(*p);
        }
        Some(aabb)
    }
}

/// 回転した直方体を包む軸平行半径を計算
///
/// ローカル半径 `half_extents` の直方体を `rotation` で回転させたとき、
/// それを包む最小のAABBの各軸半径を返します。回転行列の成分絶対値による
/// 標準的な変換です。
pub fn rotated_half_extents(half_extents: Vec3, rotation: Quat) -> Vec3 {
    let m = Mat3::from_quat(rotation);
    Vec3::new(
        m.x_axis.x.abs() * half_extents.x
            + m.y_axis.x.abs() * half_extents.y
            + m.z_axis.x.abs() * half_extents.z,
        m.x_axis.y.abs() * half_extents.x
            + m.y_axis.y.abs() * half_extents.y
            + m.z_axis.y.abs() * half_extents.z,
        m.x_axis.z.abs() * half_extents.x
            + m.y_axis.z.abs() * half_extents.y
            + m.z_axis.z.abs() * half_extents.z,
    )
}

/// 数学ユーティリティ関数
pub mod math_utils {
    use glam::{Quat, Vec3};

    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * std::f32::consts::PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * 180.0 / std::f32::consts::PI
    }

    /// ベクトルの水平成分（Y成分を0にしたもの）
    pub fn horizontal(v: Vec3) -> Vec3 {
        Vec3::new(v.x, 0.0, v.z)
    }

    /// 任意軸まわりの回転
    ///
    /// `axis` は単位ベクトルであること。`angle_rad` はラジアン。
    pub fn rotate_about_axis(v: Vec3, axis: Vec3, angle_rad: f32) -> Vec3 {
        Quat::from_axis_angle(axis, angle_rad) * v
    }

    /// 鉛直軸（Y軸）まわりの回転
    pub fn rotate_about_vertical(v: Vec3, angle_rad: f32) -> Vec3 {
        Quat::from_rotation_y(angle_rad) * v
    }

    /// 正規化（縮退時はフォールバック値を返す）
    pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
        v.try_normalize().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_contains_point() {
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0));
        assert!(aabb.contains_point(Vec3::new(1.9, -1.9, 0.0)));
        assert!(aabb.contains_point(Vec3::new(2.0, 2.0, 2.0))); // 境界面上
        assert!(!aabb.contains_point(Vec3::new(2.1, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_union() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
    }

    #[test]
    fn test_rotated_half_extents_identity() {
        let h = rotated_half_extents(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY);
        assert_relative_eq!(h.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(h.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(h.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rotated_half_extents_quarter_turn() {
        // Y軸90度回転でX半径とZ半径が入れ替わる
        let rot = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let h = rotated_half_extents(Vec3::new(1.0, 2.0, 3.0), rot);
        assert_relative_eq!(h.x, 3.0, epsilon = 1e-4);
        assert_relative_eq!(h.y, 2.0, epsilon = 1e-4);
        assert_relative_eq!(h.z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_rotate_about_vertical() {
        let v = math_utils::rotate_about_vertical(Vec3::Z, std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(v.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_or_degenerate() {
        let fallback = Vec3::Y;
        assert_eq!(math_utils::normalize_or(Vec3::ZERO, fallback), fallback);
        let n = math_utils::normalize_or(Vec3::new(0.0, 0.0, 2.0), fallback);
        assert_relative_eq!(n.z, 1.0, epsilon = 1e-6);
    }
}
