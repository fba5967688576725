use crate::models::{
    common::{Aabb, math_utils, rotated_half_extents},
    traits::IAgent,
};
use crate::scenario::AquariumScenario;
use glam::{Quat, Vec3};

/// 遊泳エージェント
///
/// 水槽内を自律遊泳する魚です。進行方位に沿った等速直線運動と、
/// 時間制限付きの滑らか旋回（2方位間の線形補間）を行います。
/// 位置の更新は必ずこのエージェントの運動処理を経由します。
#[derive(Debug, Clone)]
pub struct Fish {
    /// 魚の一意識別子
    pub id: String,
    /// 現在位置（ワールド座標）
    pub position: Vec3,
    /// 現在の進行方位（常に単位ベクトル）
    pub heading: Vec3,
    /// 旋回開始時点の方位
    pub previous_heading: Vec3,
    /// 旋回先の目標方位
    pub target_heading: Vec3,
    /// 直進セグメントの起点位置
    pub segment_origin: Vec3,
    /// 直進セグメントの開始時刻（秒）
    pub segment_start_time: f32,
    /// 旋回中かどうか
    pub turning: bool,
    /// 旋回の開始時刻（秒）
    pub turn_start_time: f32,
    /// 旋回にかける固定時間（秒）
    pub turn_duration: f32,
    /// 遊泳速度（単位/秒）
    pub speed: f32,
    /// 胴体中心から頭部先端へのローカルオフセット
    pub head_offset: Vec3,
    /// 胴体のローカル半径（衝突判定用）
    pub half_extents: Vec3,
}

impl Fish {
    /// 新しい魚エージェントを作成（シンプルな初期化）
    ///
    /// # 引数
    ///
    /// * `id` - 魚の一意識別子
    ///
    /// # 戻り値
    ///
    /// 初期化された魚インスタンス（initializeメソッドで詳細設定が必要）
    pub fn new(id: String) -> Self {
        Self {
            id,
            position: Vec3::ZERO,          // initializeで設定
            heading: Vec3::Z,              // initializeで設定
            previous_heading: Vec3::Z,
            target_heading: Vec3::Z,
            segment_origin: Vec3::ZERO,    // initializeで設定
            segment_start_time: 0.0,
            turning: false,
            turn_start_time: 0.0,
            turn_duration: 0.0,            // initializeで設定
            speed: 0.0,                    // initializeで設定
            head_offset: Vec3::ZERO,       // initializeで設定
            half_extents: Vec3::ZERO,      // initializeで設定
        }
    }

    /// 運動の前進計算
    ///
    /// 経過時刻 `t` に対する候補位置を算出します。旋回中は旧方位と
    /// 目標方位の線形補間で方位を更新し、補間率が1に達した時点で
    /// 旋回を終了してセグメント起点をリセットします。
    ///
    /// 候補位置はまだ確定していません。衝突ポリシーの評価後に
    /// `commit` で確定させてください。
    ///
    /// # 引数
    ///
    /// * `t` - シミュレーション開始からの経過時刻（秒）
    ///
    /// # 戻り値
    ///
    /// このフレームの候補位置
    pub fn advance(&mut self, t: f32) -> Vec3 {
        if self.turning {
            let fraction = if self.turn_duration > 0.0 {
                ((t - self.turn_start_time) / self.turn_duration).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let blended = self.previous_heading.lerp(self.target_heading, fraction);
            // 旧方位と目標方位がほぼ逆向きだと補間中点が縮退するため、
            // その場合は目標方位をそのまま採用する
            self.heading = math_utils::normalize_or(blended, self.target_heading);

            if fraction >= 1.0 {
                self.turning = false;
                self.segment_origin = self.position;
                self.segment_start_time = t;
            }
        }

        self.segment_origin + self.heading * self.speed * (t - self.segment_start_time)
    }

    /// 滑らか旋回の開始
    ///
    /// 現在方位を旋回の起点とし、`target` へ向かう時間制限付き旋回を
    /// 開始します。直進セグメントの起点も現在位置・現在時刻にリセット
    /// されます。
    ///
    /// # 引数
    ///
    /// * `target` - 旋回先の目標方位（内部で正規化されます）
    /// * `t` - 旋回開始時刻（秒）
    pub fn begin_turn(&mut self, target: Vec3, t: f32) {
        self.previous_heading = self.heading;
        self.target_heading = math_utils::normalize_or(target, self.heading);
        self.turning = true;
        self.turn_start_time = t;
        self.segment_origin = self.position;
        self.segment_start_time = t;
    }

    /// 位置の確定
    pub fn commit(&mut self, position: Vec3) {
        self.position = position;
    }

    /// 現在方位に対応する姿勢（前方軸+Zを方位へ向ける回転）
    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_arc(Vec3::Z, self.heading)
    }

    /// 候補位置での頭部先端点を計算
    ///
    /// 頭部オフセットを現在姿勢で回転させ、候補位置に加算します。
    pub fn head_point(&self, candidate: Vec3) -> Vec3 {
        candidate + self.orientation() * self.head_offset
    }

    /// 現在姿勢での軸平行半径
    pub fn world_half_extents(&self) -> Vec3 {
        rotated_half_extents(self.half_extents, self.orientation())
    }

    /// 指定位置を中心としたワールドAABB
    pub fn world_aabb_at(&self, position: Vec3) -> Aabb {
        Aabb::from_center_half_extents(position, self.world_half_extents())
    }

    /// 現在位置でのワールドAABB
    pub fn world_aabb(&self) -> Aabb {
        self.world_aabb_at(self.position)
    }
}

impl IAgent for Fish {
    fn initialize(&mut self, scenario: &AquariumScenario) {
        let cfg = &scenario.fish;
        self.position = Vec3::from_array(cfg.initial_position);
        self.heading = math_utils::normalize_or(Vec3::from_array(cfg.initial_heading), Vec3::Z);
        self.previous_heading = self.heading;
        self.target_heading = self.heading;
        self.segment_origin = self.position;
        self.segment_start_time = 0.0;
        self.turning = false;
        self.turn_start_time = 0.0;
        self.turn_duration = cfg.turn_duration_s;
        self.speed = cfg.speed;
        self.head_offset = Vec3::from_array(cfg.head_offset);
        self.half_extents = Vec3::from_array(cfg.half_extents);
    }

    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_fish() -> Fish {
        let mut fish = Fish::new("F001".to_string());
        fish.position = Vec3::new(0.0, -1.0, 0.0);
        fish.segment_origin = fish.position;
        fish.heading = Vec3::X;
        fish.previous_heading = Vec3::X;
        fish.target_heading = Vec3::X;
        fish.turn_duration = 0.5;
        fish.speed = 4.0;
        fish.head_offset = Vec3::new(0.0, 0.0, 3.7);
        fish.half_extents = Vec3::new(1.8, 1.5, 5.2);
        fish
    }

    #[test]
    fn test_straight_segment_motion() {
        let mut fish = test_fish();
        let candidate = fish.advance(2.0);
        assert_relative_eq!(candidate.x, 8.0, epsilon = 1e-4);
        assert_relative_eq!(candidate.y, -1.0, epsilon = 1e-4);
        assert!(!fish.turning);
    }

    #[test]
    fn test_heading_stays_unit_during_turn() {
        let mut fish = test_fish();
        let candidate = fish.advance(1.0);
        fish.commit(candidate);
        fish.begin_turn(Vec3::new(0.0, 0.3, -1.0), 1.0);

        let mut t = 1.0;
        while t < 2.0 {
            let candidate = fish.advance(t);
            fish.commit(candidate);
            assert_relative_eq!(fish.heading.length(), 1.0, epsilon = 1e-4);
            t += 1.0 / 60.0;
        }
        assert!(!fish.turning);
    }

    #[test]
    fn test_turn_interpolates_toward_target() {
        let mut fish = test_fish();
        fish.begin_turn(Vec3::Z, 0.0);

        // 旋回中間点では両方位の中間
        fish.advance(0.25);
        assert!(fish.heading.x > 0.1 && fish.heading.z > 0.1);

        // 旋回終了後は目標方位に一致し、セグメント起点がリセットされる
        fish.advance(0.5);
        assert!(!fish.turning);
        assert_relative_eq!(fish.heading.z, 1.0, epsilon = 1e-4);
        assert_relative_eq!(fish.segment_start_time, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_begin_turn_resets_segment() {
        let mut fish = test_fish();
        let candidate = fish.advance(3.0);
        fish.commit(candidate);
        let position = fish.position;
        fish.begin_turn(Vec3::Z, 3.0);

        assert!(fish.turning);
        assert_eq!(fish.segment_origin, position);
        assert_relative_eq!(fish.segment_start_time, 3.0, epsilon = 1e-6);
        assert_relative_eq!(fish.turn_start_time, 3.0, epsilon = 1e-6);
        assert_eq!(fish.previous_heading, Vec3::X);
    }

    #[test]
    fn test_opposed_headings_fall_back_to_target() {
        let mut fish = test_fish();
        fish.begin_turn(-Vec3::X, 0.0);
        // 補間中点はゼロベクトルになるが、方位は縮退しない
        fish.advance(0.25);
        assert_relative_eq!(fish.heading.length(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_head_point_follows_orientation() {
        let fish = test_fish();
        // 前方軸+Zが+Xへ回るため、頭部オフセットも+X方向へ回転する
        let head = fish.head_point(fish.position);
        assert_relative_eq!(head.x, fish.position.x + 3.7, epsilon = 1e-4);
        assert_relative_eq!(head.z, fish.position.z, epsilon = 1e-4);
    }
}
