use crate::models::{
    common::{Aabb, math_utils},
    fish::Fish,
    traits::{CorrectionReason, FrameContext, HeadingCorrection, ICollisionPolicy},
};
use crate::scenario::AquariumScenario;
use glam::Vec3;

/// 水槽の内部領域
///
/// 軸平行な水槽内部の境界を表します。幅（X）と奥行き（Z）は原点対称の
/// 半径で、上面は水面、下面は砂面の高さです。プロセス生存中は不変です。
#[derive(Debug, Clone, Copy)]
pub struct TankVolume {
    /// X方向の半径
    pub half_width: f32,
    /// Z方向の半径
    pub half_depth: f32,
    /// 水面の高さ（Y）
    pub top: f32,
    /// 砂面の高さ（Y）
    pub sand_level: f32,
}

impl TankVolume {
    pub fn from_scenario(scenario: &AquariumScenario) -> Self {
        let tank = &scenario.tank;
        Self {
            half_width: tank.width * 0.5,
            half_depth: tank.depth * 0.5,
            top: tank.height * 0.5,
            sand_level: tank.sand_level,
        }
    }

    /// AABBを水槽内へ収めるための成分別クランプ
    ///
    /// 各軸について水槽半径から `half_extents` を差し引いた範囲に
    /// 位置を制限します。ポリシーの判定が1フレーム遅れても境界ボックスが
    /// 水槽外へ出ないことを保証します。
    pub fn clamp_position(&self, position: Vec3, half_extents: Vec3) -> Vec3 {
        Vec3::new(
            clamp_axis(position.x, -self.half_width + half_extents.x, self.half_width - half_extents.x),
            clamp_axis(position.y, self.sand_level + half_extents.y, self.top - half_extents.y),
            clamp_axis(position.z, -self.half_depth + half_extents.z, self.half_depth - half_extents.z),
        )
    }

    /// 境界違反の分類
    ///
    /// AABBのいずれかの面が境界面に到達していれば違反です。
    /// 側面（X/Z）を先に判定し、次に上下（Y）を判定します。
    pub fn classify_violation(&self, aabb: &Aabb) -> Option<BoundaryViolation> {
        if aabb.max.x >= self.half_width || aabb.min.x <= -self.half_width {
            return Some(BoundaryViolation::SideX);
        }
        if aabb.max.z >= self.half_depth || aabb.min.z <= -self.half_depth {
            return Some(BoundaryViolation::SideZ);
        }
        if aabb.max.y >= self.top {
            return Some(BoundaryViolation::Top);
        }
        if aabb.min.y <= self.sand_level {
            return Some(BoundaryViolation::Sand);
        }
        None
    }
}

fn clamp_axis(value: f32, lo: f32, hi: f32) -> f32 {
    if lo <= hi {
        value.clamp(lo, hi)
    } else {
        // エージェントが軸方向に水槽より大きい場合は中央へ寄せる
        (lo + hi) * 0.5
    }
}

/// 境界違反の種別
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryViolation {
    /// X側面への到達
    SideX,
    /// Z側面への到達
    SideZ,
    /// 水面への到達
    Top,
    /// 砂面への到達
    Sand,
}

impl BoundaryViolation {
    pub fn is_side(&self) -> bool {
        matches!(self, BoundaryViolation::SideX | BoundaryViolation::SideZ)
    }
}

/// 水槽境界の衝突ポリシー
///
/// 魚のワールドAABBが水槽境界面に到達した場合に、内側へ向かう
/// 新しい目標方位を生成します。
///
/// 側面違反では現在の水平方位を鉛直軸まわりに[最小角, 最大角]の
/// 一様乱数角（符号も乱数）だけ回し、小さな鉛直ゆらぎを加えます。
/// 上下違反では現在方位を、方位と鉛直補正方向の両方に直交する軸まわりに
/// 小角回転させ、固定量の鉛直成分（水面なら下向き、砂面なら上向き）を
/// 強制します。
#[derive(Debug, Clone)]
pub struct TankBoundaryPolicy {
    /// 水槽の内部領域
    pub volume: TankVolume,
    /// 側面違反時の旋回角範囲（度）
    pub side_turn_deg: [f32; 2],
    /// 側面違反時の鉛直ゆらぎ幅
    pub side_vertical_jitter: f32,
    /// 上下違反時の回転角範囲（度、±）
    pub vertical_turn_deg: f32,
    /// 上下違反時に強制する鉛直成分
    pub vertical_kick: f32,
}

impl TankBoundaryPolicy {
    pub fn from_scenario(scenario: &AquariumScenario) -> Self {
        let steering = &scenario.steering;
        Self {
            volume: TankVolume::from_scenario(scenario),
            side_turn_deg: steering.side_turn_deg,
            side_vertical_jitter: steering.side_vertical_jitter,
            vertical_turn_deg: steering.vertical_turn_deg,
            vertical_kick: steering.vertical_kick,
        }
    }

    fn side_correction(&self, fish: &Fish, rng: &mut fastrand::Rng) -> Vec3 {
        // 水平方位が縮退している（真上/真下を向いている）場合は
        // 水槽中心方向を基準にする
        let inward = math_utils::horizontal(-fish.position);
        let base = math_utils::normalize_or(
            math_utils::horizontal(fish.heading),
            math_utils::normalize_or(inward, Vec3::Z),
        );

        let [lo, hi] = self.side_turn_deg;
        let magnitude = math_utils::deg_to_rad(lo + (hi - lo) * rng.f32());
        let angle = if rng.bool() { magnitude } else { -magnitude };
        let rotated = math_utils::rotate_about_vertical(base, angle);

        let jitter = (rng.f32() * 2.0 - 1.0) * self.side_vertical_jitter;
        math_utils::normalize_or(rotated + Vec3::Y * jitter, rotated)
    }

    fn vertical_correction(&self, fish: &Fish, hit_top: bool, rng: &mut fastrand::Rng) -> Vec3 {
        let correction = if hit_top { Vec3::NEG_Y } else { Vec3::Y };

        let axis = fish.heading.cross(correction);
        let mut result = match axis.try_normalize() {
            Some(axis) => {
                let angle = math_utils::deg_to_rad(
                    (rng.f32() * 2.0 - 1.0) * self.vertical_turn_deg,
                );
                math_utils::rotate_about_axis(fish.heading, axis, angle)
            }
            // 方位が鉛直補正方向と平行な場合、回転軸が定義できないため
            // 補正方向そのものへ向ける
            None => correction,
        };

        result.y = if hit_top {
            -self.vertical_kick
        } else {
            self.vertical_kick
        };
        math_utils::normalize_or(result, correction)
    }
}

impl ICollisionPolicy for TankBoundaryPolicy {
    fn evaluate(
        &self,
        fish: &Fish,
        context: &FrameContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> Option<HeadingCorrection> {
        let violation = self.volume.classify_violation(&context.fish_aabb)?;

        let (target_heading, reason) = match violation {
            BoundaryViolation::SideX | BoundaryViolation::SideZ => {
                (self.side_correction(fish, rng), CorrectionReason::TankSide)
            }
            BoundaryViolation::Top => (
                self.vertical_correction(fish, true, rng),
                CorrectionReason::TankTop,
            ),
            BoundaryViolation::Sand => (
                self.vertical_correction(fish, false, rng),
                CorrectionReason::TankSand,
            ),
        };

        Some(HeadingCorrection {
            target_heading,
            reason,
            discard_candidate: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_volume() -> TankVolume {
        TankVolume {
            half_width: 30.0,
            half_depth: 24.0,
            top: 18.0,
            sand_level: -16.0,
        }
    }

    fn test_policy() -> TankBoundaryPolicy {
        TankBoundaryPolicy {
            volume: test_volume(),
            side_turn_deg: [60.0, 120.0],
            side_vertical_jitter: 0.25,
            vertical_turn_deg: 15.0,
            vertical_kick: 0.3,
        }
    }

    fn fish_at(position: Vec3, heading: Vec3) -> Fish {
        let mut fish = Fish::new("F001".to_string());
        fish.position = position;
        fish.segment_origin = position;
        fish.heading = heading.normalize();
        fish.half_extents = Vec3::new(1.8, 1.5, 5.2);
        fish.speed = 4.0;
        fish.turn_duration = 0.5;
        fish
    }

    #[test]
    fn test_clamp_keeps_box_inside() {
        let volume = test_volume();
        let half = Vec3::new(2.0, 1.5, 5.0);
        let clamped = volume.clamp_position(Vec3::new(100.0, -100.0, 0.0), half);
        assert_relative_eq!(clamped.x, 28.0, epsilon = 1e-5);
        assert_relative_eq!(clamped.y, -14.5, epsilon = 1e-5);
        assert_relative_eq!(clamped.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_classify_side_before_vertical() {
        let volume = test_volume();
        let inside = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.0));
        assert_eq!(volume.classify_violation(&inside), None);

        let at_wall =
            Aabb::from_center_half_extents(Vec3::new(28.0, 0.0, 0.0), Vec3::splat(2.0));
        assert_eq!(volume.classify_violation(&at_wall), Some(BoundaryViolation::SideX));

        let at_top = Aabb::from_center_half_extents(Vec3::new(0.0, 16.5, 0.0), Vec3::splat(1.5));
        assert_eq!(volume.classify_violation(&at_top), Some(BoundaryViolation::Top));

        let at_sand =
            Aabb::from_center_half_extents(Vec3::new(0.0, -14.5, 0.0), Vec3::splat(1.5));
        assert_eq!(volume.classify_violation(&at_sand), Some(BoundaryViolation::Sand));
    }

    #[test]
    fn test_side_correction_angle_range() {
        let policy = test_policy();
        let mut rng = fastrand::Rng::with_seed(11);
        let fish = fish_at(Vec3::new(29.0, 0.0, 0.0), Vec3::X);

        for _ in 0..200 {
            let target = policy.side_correction(&fish, &mut rng);
            assert_relative_eq!(target.length(), 1.0, epsilon = 1e-4);

            let horizontal = math_utils::horizontal(target).normalize();
            let angle = math_utils::rad_to_deg(horizontal.dot(Vec3::X).clamp(-1.0, 1.0).acos());
            assert!(
                (60.0..=120.0).contains(&angle),
                "side turn angle {angle} out of range"
            );
            assert!(target.y.abs() <= 0.3);
        }
    }

    #[test]
    fn test_vertical_correction_forces_component() {
        let policy = test_policy();
        let mut rng = fastrand::Rng::with_seed(7);

        let rising = fish_at(Vec3::new(0.0, 16.0, 0.0), Vec3::new(0.4, 0.8, 0.0));
        let from_top = policy.vertical_correction(&rising, true, &mut rng);
        assert!(from_top.y < 0.0);

        let sinking = fish_at(Vec3::new(0.0, -14.0, 0.0), Vec3::new(0.4, -0.8, 0.0));
        let from_sand = policy.vertical_correction(&sinking, false, &mut rng);
        assert!(from_sand.y > 0.0);
    }

    #[test]
    fn test_vertical_correction_degenerate_axis() {
        let policy = test_policy();
        let mut rng = fastrand::Rng::with_seed(3);

        // 真上を向いたまま水面に到達した場合、回転軸が定義できない
        let straight_up = fish_at(Vec3::new(0.0, 16.0, 0.0), Vec3::Y);
        let target = policy.vertical_correction(&straight_up, true, &mut rng);
        assert!(target.y < 0.0);
        assert_relative_eq!(target.length(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_evaluate_reports_reason() {
        let policy = test_policy();
        let mut rng = fastrand::Rng::with_seed(5);
        let fish = fish_at(Vec3::new(28.5, 0.0, 0.0), Vec3::X);
        let aabb = fish.world_aabb();

        let context = FrameContext {
            time: 1.0,
            candidate: fish.position,
            head_point: fish.head_point(fish.position),
            fish_aabb: aabb,
            obstacles: &[],
        };

        let correction = policy
            .evaluate(&fish, &context, &mut rng)
            .expect("wall contact must produce a correction");
        assert_eq!(correction.reason, CorrectionReason::TankSide);
        assert!(!correction.discard_candidate);
    }
}
